//! Overlay window lifecycle and geometry tracking.
//!
//! An [`OverlayWindow`] owns a native overlay window together with the
//! [`Renderer`] bound to it. It is either standalone, covering the primary
//! screen, or attached to a parent window whose bounds it follows on every
//! [`update`](OverlayWindow::update).

use tracing::{debug, error, info, trace};

use crate::geometry::{Bounds, WindowHandle};
use crate::platform::{NativeWindow, WindowPlatform};
use crate::renderer::{DeviceOptions, Renderer};
use crate::{Error, Result};

/// A transparent, click-through, topmost window with its renderer.
pub struct OverlayWindow<P: WindowPlatform> {
    // Released before `window`, see `dispose`.
    renderer: Option<Renderer<P::Device>>,
    window: Option<P::Window>,
    platform: P,
    handle: WindowHandle,
    parent: Option<WindowHandle>,
    bounds: Bounds,
    is_visible: bool,
    is_top_most: bool,
}

impl<P: WindowPlatform> OverlayWindow<P> {
    /// Create an overlay covering the primary screen.
    pub fn standalone(platform: P, limit_fps: bool) -> Result<Self> {
        let bounds = platform.desktop_bounds();
        Self::create(platform, None, bounds, limit_fps)
    }

    /// Create an overlay on top of `parent`, following its bounds.
    ///
    /// Fails with [`Error::InvalidParentWindow`] if `parent` is null or does
    /// not identify a live window.
    pub fn attached(platform: P, parent: WindowHandle, limit_fps: bool) -> Result<Self> {
        if parent.is_null() || !platform.is_window(parent) {
            return Err(Error::InvalidParentWindow(parent));
        }

        let bounds = platform.window_bounds(parent)?;
        Self::create(platform, Some(parent), bounds, limit_fps)
    }

    fn create(
        platform: P,
        parent: Option<WindowHandle>,
        bounds: Bounds,
        limit_fps: bool,
    ) -> Result<Self> {
        let mut window = platform.create_window(bounds)?;
        let handle = window.handle();

        let device = window.extend_frame_into_client_area().and_then(|_| {
            platform.create_device(&window, DeviceOptions { size: bounds.size(), limit_fps })
        });
        let device = match device {
            Ok(device) => device,
            Err(e) => {
                if let Err(e) = window.destroy() {
                    error!("Couldn't destroy overlay window: {e:?}");
                }
                return Err(e);
            },
        };

        info!("Created overlay window {handle:?} at {bounds:?} (parent: {parent:?})");

        Ok(Self {
            renderer: Some(Renderer::new(device, bounds.size())),
            window: Some(window),
            platform,
            handle,
            parent,
            bounds,
            is_visible: true,
            is_top_most: true,
        })
    }

    fn native(&mut self, operation: &'static str) -> Result<&mut P::Window> {
        self.window.as_mut().ok_or(Error::InvalidState { operation, state: "disposed" })
    }

    /// Native handle of the overlay. Stays readable after disposal.
    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    /// Handle of the followed window, if attached.
    pub fn parent(&self) -> Option<WindowHandle> {
        self.parent
    }

    /// Whether the followed window is still alive. Always `false` for a
    /// standalone overlay.
    pub fn parent_window_exists(&self) -> bool {
        self.parent.map_or(false, |parent| self.platform.is_window(parent))
    }

    /// Last applied bounds.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Left edge.
    pub fn x(&self) -> i32 {
        self.bounds.x
    }

    /// Top edge.
    pub fn y(&self) -> i32 {
        self.bounds.y
    }

    /// Width.
    pub fn width(&self) -> i32 {
        self.bounds.width
    }

    /// Height.
    pub fn height(&self) -> i32 {
        self.bounds.height
    }

    /// Whether the overlay is shown.
    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    /// Whether the overlay stays above non-topmost windows.
    pub fn is_top_most(&self) -> bool {
        self.is_top_most
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.window.is_none()
    }

    /// The renderer bound to the overlay, until disposal.
    pub fn renderer(&self) -> Option<&Renderer<P::Device>> {
        self.renderer.as_ref()
    }

    /// The renderer bound to the overlay, until disposal.
    pub fn renderer_mut(&mut self) -> Option<&mut Renderer<P::Device>> {
        self.renderer.as_mut()
    }

    /// Follow the parent window.
    ///
    /// Returns `true` if the parent had moved or resized since the last poll
    /// and the overlay was synchronized to it. Standalone overlays never
    /// change, and an overlay whose parent is gone keeps its last bounds.
    pub fn update(&mut self) -> Result<bool> {
        let Some(parent) = self.parent else {
            return Ok(false);
        };
        if !self.platform.is_window(parent) {
            trace!("Parent window {parent:?} is gone, keeping {:?}", self.bounds);
            return Ok(false);
        }

        let bounds = self.platform.window_bounds(parent)?;
        self.follow(bounds)
    }

    /// Synchronize to `bounds` unless the overlay already has them.
    ///
    /// Returns whether the overlay moved or resized.
    pub fn follow(&mut self, bounds: Bounds) -> Result<bool> {
        if bounds == self.bounds {
            return Ok(false);
        }

        self.set_bounds(bounds)?;
        Ok(true)
    }

    /// Move and resize the overlay.
    ///
    /// The renderer resizes its surface at the next scene boundary.
    pub fn set_bounds(&mut self, bounds: Bounds) -> Result<()> {
        let window = self.native("set bounds")?;
        window.set_bounds(bounds)?;
        window.extend_frame_into_client_area()?;

        self.bounds = bounds;
        if let Some(renderer) = self.renderer.as_mut() {
            let (width, height) = bounds.size();
            renderer.request_resize(width, height);
        }

        debug!("Overlay window {:?} synchronized to {bounds:?}", self.handle);
        Ok(())
    }

    /// Move the overlay, keeping its size.
    pub fn set_position(&mut self, x: i32, y: i32) -> Result<()> {
        self.set_bounds(Bounds { x, y, ..self.bounds })
    }

    /// Resize the overlay, keeping its position.
    pub fn set_size(&mut self, width: i32, height: i32) -> Result<()> {
        self.set_bounds(Bounds { width, height, ..self.bounds })
    }

    /// Show the overlay. Does nothing if it is already shown.
    pub fn show(&mut self) -> Result<()> {
        if self.is_visible {
            return Ok(());
        }

        let window = self.native("show")?;
        window.set_visible(true)?;
        window.extend_frame_into_client_area()?;
        self.is_visible = true;

        debug!("Overlay window {:?} shown", self.handle);
        Ok(())
    }

    /// Hide the overlay. Does nothing if it is already hidden.
    pub fn hide(&mut self) -> Result<()> {
        if !self.is_visible {
            return Ok(());
        }

        self.native("hide")?.set_visible(false)?;
        self.is_visible = false;

        debug!("Overlay window {:?} hidden", self.handle);
        Ok(())
    }

    /// Drain the overlay's native message queue.
    pub fn pump_messages(&mut self) {
        if let Some(window) = self.window.as_mut() {
            window.pump_messages();
        }
    }

    /// Release the renderer, then destroy the native window.
    ///
    /// Calling this more than once is harmless.
    pub fn dispose(&mut self) -> Result<()> {
        drop(self.renderer.take());

        match self.window.take() {
            Some(window) => {
                window.destroy()?;
                info!("Destroyed overlay window {:?}", self.handle);
                Ok(())
            },
            None => Ok(()),
        }
    }
}

impl<P: WindowPlatform> Drop for OverlayWindow<P> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            error!("Couldn't dispose overlay window {:?}: {e:?}", self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::{HeadlessPlatform, HeadlessTarget, NativeCall};
    use crate::platform::TargetWindow;

    const TARGET: Bounds = Bounds::new(100, 100, 800, 600);

    fn attach(
        platform: &HeadlessPlatform,
        target: &HeadlessTarget,
    ) -> OverlayWindow<HeadlessPlatform> {
        OverlayWindow::attached(platform.clone(), target.handle(), false).unwrap()
    }

    fn set_bounds_calls(platform: &HeadlessPlatform) -> usize {
        platform.calls().iter().filter(|c| matches!(c, NativeCall::SetBounds(..))).count()
    }

    #[test]
    fn test_attached_rejects_invalid_parent() {
        let platform = HeadlessPlatform::new();
        assert!(matches!(
            OverlayWindow::attached(platform.clone(), WindowHandle::NULL, false),
            Err(Error::InvalidParentWindow(WindowHandle::NULL))
        ));

        let target = platform.spawn_target(TARGET);
        target.close();
        assert!(matches!(
            OverlayWindow::attached(platform.clone(), target.handle(), false),
            Err(Error::InvalidParentWindow(_))
        ));
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn test_attached_starts_on_parent() {
        let platform = HeadlessPlatform::new();
        let target = platform.spawn_target(TARGET);
        let overlay = OverlayWindow::attached(platform.clone(), target.handle(), false).unwrap();

        assert_eq!(overlay.bounds(), TARGET);
        assert!(overlay.is_visible());
        assert!(overlay.is_top_most());
        assert!(overlay.parent_window_exists());
        assert_eq!(overlay.renderer().map(|r| r.size()), Some((800, 600)));
        assert_eq!(
            platform.calls(),
            [
                NativeCall::CreateWindow(overlay.handle(), TARGET),
                NativeCall::ExtendFrame(overlay.handle()),
                NativeCall::CreateDevice(overlay.handle()),
            ]
        );
    }

    #[test]
    fn test_standalone_covers_desktop() {
        let platform = HeadlessPlatform::with_desktop(Bounds::new(0, 0, 2560, 1440));
        let mut overlay = OverlayWindow::standalone(platform.clone(), false).unwrap();
        assert_eq!(overlay.bounds(), Bounds::new(0, 0, 2560, 1440));
        assert!(!overlay.parent_window_exists());
        assert!(!overlay.update().unwrap());
    }

    #[test]
    fn test_update_detects_changes() {
        let platform = HeadlessPlatform::new();
        let target = platform.spawn_target(TARGET);
        let mut overlay = attach(&platform, &target);

        assert!(!overlay.update().unwrap());
        assert!(!overlay.update().unwrap());
        assert_eq!(set_bounds_calls(&platform), 0);

        let moved = Bounds::new(120, 100, 800, 600);
        target.set_bounds(moved);
        assert!(overlay.update().unwrap());
        assert!(!overlay.update().unwrap());
        assert_eq!(set_bounds_calls(&platform), 1);
        assert_eq!(overlay.bounds(), moved);
    }

    #[test]
    fn test_update_keeps_bounds_of_closed_parent() {
        let platform = HeadlessPlatform::new();
        let target = platform.spawn_target(TARGET);
        let mut overlay = attach(&platform, &target);

        target.close();
        assert!(!overlay.update().unwrap());
        assert!(!overlay.update().unwrap());
        assert!(!overlay.parent_window_exists());
        assert_eq!(overlay.bounds(), TARGET);
        assert_eq!(set_bounds_calls(&platform), 0);
    }

    #[test]
    fn test_resize_is_deferred() {
        let platform = HeadlessPlatform::new();
        let target = platform.spawn_target(TARGET);
        let mut overlay = attach(&platform, &target);

        overlay.set_size(1024, 768).unwrap();
        let renderer = overlay.renderer_mut().unwrap();
        assert!(renderer.has_pending_resize());
        assert_eq!(renderer.size(), (800, 600));

        renderer.begin_scene().unwrap();
        renderer.end_scene().unwrap();
        assert_eq!(renderer.size(), (1024, 768));
    }

    #[test]
    fn test_show_hide_idempotent() {
        let platform = HeadlessPlatform::new();
        let target = platform.spawn_target(TARGET);
        let mut overlay = attach(&platform, &target);
        platform.clear_log();

        overlay.show().unwrap();
        assert!(platform.calls().is_empty());

        overlay.hide().unwrap();
        overlay.hide().unwrap();
        assert_eq!(platform.calls(), [NativeCall::SetVisible(overlay.handle(), false)]);
        assert!(!overlay.is_visible());

        platform.clear_log();
        overlay.show().unwrap();
        overlay.show().unwrap();
        assert_eq!(
            platform.calls(),
            [
                NativeCall::SetVisible(overlay.handle(), true),
                NativeCall::ExtendFrame(overlay.handle()),
            ]
        );
    }

    #[test]
    fn test_dispose_releases_device_first() {
        let platform = HeadlessPlatform::new();
        let target = platform.spawn_target(TARGET);
        let mut overlay = attach(&platform, &target);
        let handle = overlay.handle();
        platform.clear_log();

        overlay.dispose().unwrap();
        overlay.dispose().unwrap();
        assert_eq!(
            platform.calls(),
            [NativeCall::ReleaseDevice(handle), NativeCall::DestroyWindow(handle)]
        );
        assert!(overlay.is_disposed());
        assert!(overlay.renderer().is_none());
        assert!(matches!(overlay.hide(), Err(Error::InvalidState { .. })));

        drop(overlay);
        assert_eq!(platform.calls().len(), 2);
    }

    #[test]
    fn test_device_failure_destroys_window() {
        let platform = HeadlessPlatform::new();
        let target = platform.spawn_target(TARGET);
        platform.fail_device_creation(true);

        assert!(matches!(
            OverlayWindow::attached(platform.clone(), target.handle(), false),
            Err(Error::DeviceCreation(_))
        ));
        assert_eq!(platform.window_count(), 1);
        assert!(matches!(platform.calls().last(), Some(NativeCall::DestroyWindow(_))));
    }
}
