//! The native seam.
//!
//! Everything the overlay needs from the operating system goes through the
//! traits in this module: creating the overlay window, querying foreign
//! windows, and binding a [`DrawDevice`] to a window. [`win32`] implements
//! them on top of the Win32, DWM and Direct2D APIs; [`headless`] implements
//! them without any OS window, recording every call for inspection.

use crate::geometry::{Bounds, WindowHandle};
use crate::renderer::{DeviceOptions, DrawDevice};
use crate::Result;

pub mod headless;
#[cfg(windows)]
pub mod win32;

/// A native overlay window.
///
/// The window is created topmost, layered, click-through, non-activating and
/// hidden from task switchers. It is destroyed by consuming it through
/// [`destroy`](NativeWindow::destroy), so it can be destroyed at most once.
pub trait NativeWindow {
    /// Native handle of the window.
    fn handle(&self) -> WindowHandle;

    /// Move and resize the window, keeping it topmost.
    fn set_bounds(&mut self, bounds: Bounds) -> Result<()>;

    /// Show or hide the window without activating it.
    fn set_visible(&mut self, visible: bool) -> Result<()>;

    /// Extend the non-client frame over the whole client area.
    fn extend_frame_into_client_area(&mut self) -> Result<()>;

    /// Dispatch the messages queued for this window.
    fn pump_messages(&mut self) {}

    /// Destroy the native window.
    fn destroy(self) -> Result<()>
    where
        Self: Sized;
}

/// A window owned by another application that an overlay follows.
///
/// The overlay never owns the target; it polls it every pre-tick.
pub trait TargetWindow {
    /// Native handle of the target.
    fn handle(&self) -> WindowHandle;

    /// Current screen bounds of the target.
    fn bounds(&self) -> Result<Bounds>;

    /// Whether the target currently has the input focus.
    fn is_activated(&self) -> bool;
}

impl<T: TargetWindow + ?Sized> TargetWindow for &T {
    fn handle(&self) -> WindowHandle {
        (**self).handle()
    }

    fn bounds(&self) -> Result<Bounds> {
        (**self).bounds()
    }

    fn is_activated(&self) -> bool {
        (**self).is_activated()
    }
}

/// Factory for native windows and drawing devices.
pub trait WindowPlatform {
    /// Overlay window type.
    type Window: NativeWindow;
    /// Drawing device type.
    type Device: DrawDevice;

    /// Bounds of the primary screen.
    fn desktop_bounds(&self) -> Bounds;

    /// Whether `handle` identifies a live window.
    fn is_window(&self, handle: WindowHandle) -> bool;

    /// Current screen bounds of any window.
    fn window_bounds(&self, handle: WindowHandle) -> Result<Bounds>;

    /// Create a visible overlay window covering `bounds`.
    fn create_window(&self, bounds: Bounds) -> Result<Self::Window>;

    /// Bind a drawing device to `window`.
    fn create_device(&self, window: &Self::Window, options: DeviceOptions)
        -> Result<Self::Device>;
}
