//! Helpers for the raw Win32 API.

use std::ffi::c_void;

use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::UI::WindowsAndMessaging::GetWindowRect;

use crate::geometry::{Bounds, WindowHandle};

/// Helper for fallible [`windows`] APIs that have an out-param with a default
/// value.
///
/// # Example
///
/// ```ignore
/// let rect = try_out_param(|rect| unsafe { GetWindowRect(hwnd, rect) })?;
/// ```
pub fn try_out_param<T, F, E, O>(mut f: F) -> Result<T, E>
where
    T: Default,
    F: FnMut(&mut T) -> Result<O, E>,
{
    let mut t: T = Default::default();
    f(&mut t).map(|_| t)
}

/// Null-terminated UTF-16 copy of `s`, for `PCWSTR` parameters.
pub fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// The [`HWND`] a [`WindowHandle`] stands for.
pub fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

/// The [`WindowHandle`] of an [`HWND`].
pub fn window_handle(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

/// Screen bounds of a window, including its frame.
pub fn window_bounds(hwnd: HWND) -> windows::core::Result<Bounds> {
    let rect: RECT = try_out_param(|rect| unsafe { GetWindowRect(hwnd, rect) })?;
    Ok(Bounds::from_edges(rect.left, rect.top, rect.right, rect.bottom))
}
