//! Win32 overlay windows.
//!
//! Overlays are popup windows of the system `Static` class, so no window
//! class needs to be registered. They are created with the styles that make
//! them behave as a sheet of glass over the target:
//!
//! - `WS_EX_TOPMOST`: above every non-topmost window.
//! - `WS_EX_LAYERED` with a full alpha key: the Direct2D surface decides the
//!   per-pixel transparency.
//! - `WS_EX_TRANSPARENT`, `WS_DISABLED`: mouse input falls through.
//! - `WS_EX_NOACTIVATE`: never takes the focus from the target.
//! - `WS_EX_TOOLWINDOW`: hidden from the taskbar and Alt+Tab.

use tracing::{debug, error};
use windows::core::w;
use windows::Win32::Foundation::{COLORREF, HWND};
use windows::Win32::Graphics::Dwm::DwmExtendFrameIntoClientArea;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Controls::MARGINS;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DestroyWindow, DispatchMessageW, GetForegroundWindow, GetSystemMetrics,
    IsWindow, PeekMessageW, SetLayeredWindowAttributes, SetWindowPos, ShowWindow,
    TranslateMessage, HWND_TOPMOST, LWA_ALPHA, MSG, PM_REMOVE, SM_CXSCREEN, SM_CYSCREEN,
    SWP_NOACTIVATE, SWP_SHOWWINDOW, SW_HIDE, SW_SHOWNOACTIVATE, WS_DISABLED, WS_EX_LAYERED,
    WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP, WS_VISIBLE,
};

use crate::geometry::{Bounds, WindowHandle};
use crate::platform::{NativeWindow, TargetWindow, WindowPlatform};
use crate::renderer::d2d::D2DDevice;
use crate::renderer::DeviceOptions;
use crate::util;
use crate::{Error, Result};

// Negative margins extend the frame over the whole window.
const SHEET_OF_GLASS: MARGINS =
    MARGINS { cxLeftWidth: -1, cxRightWidth: -1, cyTopHeight: -1, cyBottomHeight: -1 };

/// Native Windows implementation of [`WindowPlatform`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Platform;

impl WindowPlatform for Win32Platform {
    type Window = Win32Window;
    type Device = D2DDevice;

    fn desktop_bounds(&self) -> Bounds {
        unsafe { Bounds::new(0, 0, GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }

    fn is_window(&self, handle: WindowHandle) -> bool {
        !handle.is_null() && unsafe { IsWindow(util::hwnd(handle)) }.as_bool()
    }

    fn window_bounds(&self, handle: WindowHandle) -> Result<Bounds> {
        Ok(util::window_bounds(util::hwnd(handle))?)
    }

    fn create_window(&self, bounds: Bounds) -> Result<Win32Window> {
        let hwnd = unsafe {
            let hinstance = GetModuleHandleW(None)?;
            CreateWindowExW(
                WS_EX_TOPMOST
                    | WS_EX_TRANSPARENT
                    | WS_EX_LAYERED
                    | WS_EX_TOOLWINDOW
                    | WS_EX_NOACTIVATE,
                w!("Static"),
                w!("hudlayer"),
                WS_POPUP | WS_VISIBLE | WS_DISABLED,
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                None,
                None,
                hinstance,
                None,
            )
        }
        .map_err(|e| Error::WindowCreation(e.to_string()))?;

        let window = Win32Window { hwnd };
        if let Err(e) = window.make_overlay(bounds) {
            if let Err(e) = window.destroy() {
                error!("Couldn't destroy overlay window: {e:?}");
            }
            return Err(Error::WindowCreation(e.to_string()));
        }

        debug!("Created overlay window {hwnd:?}");
        Ok(window)
    }

    fn create_device(&self, window: &Win32Window, options: DeviceOptions) -> Result<D2DDevice> {
        D2DDevice::new(window.hwnd, options)
    }
}

/// A Win32 overlay window.
pub struct Win32Window {
    hwnd: HWND,
}

impl Win32Window {
    /// Raw window handle.
    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    fn make_overlay(&self, bounds: Bounds) -> windows::core::Result<()> {
        unsafe {
            SetLayeredWindowAttributes(self.hwnd, COLORREF(0), 255, LWA_ALPHA)?;
            SetWindowPos(
                self.hwnd,
                HWND_TOPMOST,
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                SWP_NOACTIVATE | SWP_SHOWWINDOW,
            )
        }
    }
}

impl NativeWindow for Win32Window {
    fn handle(&self) -> WindowHandle {
        util::window_handle(self.hwnd)
    }

    fn set_bounds(&mut self, bounds: Bounds) -> Result<()> {
        unsafe {
            SetWindowPos(
                self.hwnd,
                HWND_TOPMOST,
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                SWP_NOACTIVATE,
            )?
        };
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> Result<()> {
        // The return value is the previous visibility, not an error.
        let _ = unsafe { ShowWindow(self.hwnd, if visible { SW_SHOWNOACTIVATE } else { SW_HIDE }) };
        Ok(())
    }

    fn extend_frame_into_client_area(&mut self) -> Result<()> {
        unsafe { DwmExtendFrameIntoClientArea(self.hwnd, &SHEET_OF_GLASS)? };
        Ok(())
    }

    fn pump_messages(&mut self) {
        let mut msg = MSG::default();
        unsafe {
            while PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    fn destroy(self) -> Result<()> {
        unsafe { DestroyWindow(self.hwnd)? };
        Ok(())
    }
}

/// A top-level window of another application.
#[derive(Debug, Clone, Copy)]
pub struct Win32Target {
    hwnd: HWND,
}

impl Win32Target {
    /// Follow the window identified by `handle`.
    ///
    /// Fails with [`Error::InvalidParentWindow`] if it is not a live window.
    pub fn new(handle: WindowHandle) -> Result<Self> {
        if !Win32Platform.is_window(handle) {
            return Err(Error::InvalidParentWindow(handle));
        }
        Ok(Self { hwnd: util::hwnd(handle) })
    }
}

impl TargetWindow for Win32Target {
    fn handle(&self) -> WindowHandle {
        util::window_handle(self.hwnd)
    }

    fn bounds(&self) -> Result<Bounds> {
        Ok(util::window_bounds(self.hwnd)?)
    }

    fn is_activated(&self) -> bool {
        unsafe { GetForegroundWindow() } == self.hwnd
    }
}
