//! Recording backend with no OS window behind it.
//!
//! [`HeadlessPlatform`] keeps a registry of simulated windows and a log of
//! every native call and draw command issued by the windows and devices it
//! creates. Clones share the same state, so a host can hand one clone to an
//! overlay and keep another to drive [`HeadlessTarget`]s and inspect the log.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::geometry::{Bounds, Color, Point, Rect, WindowHandle};
use crate::platform::{NativeWindow, TargetWindow, WindowPlatform};
use crate::renderer::{DeviceOptions, DrawDevice, FontDesc};
use crate::{Error, Result};

/// A call issued against a native window or device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    /// An overlay window was created.
    CreateWindow(WindowHandle, Bounds),
    /// A window was moved or resized.
    SetBounds(WindowHandle, Bounds),
    /// A window was shown or hidden.
    SetVisible(WindowHandle, bool),
    /// A window frame was extended over its client area.
    ExtendFrame(WindowHandle),
    /// A window's message queue was drained.
    PumpMessages(WindowHandle),
    /// A window was destroyed.
    DestroyWindow(WindowHandle),
    /// A device was bound to a window.
    CreateDevice(WindowHandle),
    /// A device was released.
    ReleaseDevice(WindowHandle),
}

/// A command issued against a drawing device.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// A brush was created.
    CreateBrush(Color),
    /// A font was created.
    CreateFont(FontDesc),
    /// A text layout was created.
    CreateTextLayout(String),
    /// The surface was resized.
    Resize(u32, u32),
    /// Recording started.
    BeginDraw,
    /// Recording ended and the frame was presented.
    EndDraw,
    /// The surface was cleared.
    Clear(Color),
    /// A line was stroked.
    Line {
        /// Start point.
        from: Point,
        /// End point.
        to: Point,
        /// Stroke width.
        stroke: f32,
        /// Brush color.
        brush: Color,
    },
    /// A rectangle outline was stroked.
    Rectangle {
        /// Rectangle.
        rect: Rect,
        /// Stroke width.
        stroke: f32,
        /// Brush color.
        brush: Color,
    },
    /// A rectangle was filled.
    FillRectangle {
        /// Rectangle.
        rect: Rect,
        /// Brush color.
        brush: Color,
    },
    /// An ellipse outline was stroked.
    Ellipse {
        /// Center.
        center: Point,
        /// Horizontal radius.
        radius_x: f32,
        /// Vertical radius.
        radius_y: f32,
        /// Stroke width.
        stroke: f32,
        /// Brush color.
        brush: Color,
    },
    /// An ellipse was filled.
    FillEllipse {
        /// Center.
        center: Point,
        /// Horizontal radius.
        radius_x: f32,
        /// Vertical radius.
        radius_y: f32,
        /// Brush color.
        brush: Color,
    },
    /// Text was drawn.
    Text {
        /// Top-left corner.
        origin: Point,
        /// The laid out string.
        text: String,
        /// Brush color.
        brush: Color,
        /// Whether the text was snapped to pixels.
        snap: bool,
    },
}

#[derive(Default)]
struct State {
    next_handle: isize,
    windows: HashMap<WindowHandle, Bounds>,
    foreground: WindowHandle,
    calls: Vec<NativeCall>,
    commands: Vec<DrawCommand>,
    frames_presented: usize,
    live_resources: usize,
    fail_window_creation: bool,
    fail_device_creation: bool,
    failing_resizes: usize,
    failing_presents: usize,
}

impl State {
    fn allocate_handle(&mut self, bounds: Bounds) -> WindowHandle {
        self.next_handle += 1;
        let handle = WindowHandle(self.next_handle * 0x10);
        self.windows.insert(handle, bounds);
        handle
    }
}

type Shared = Arc<Mutex<State>>;

/// In-memory [`WindowPlatform`]. See the [module documentation](self).
#[derive(Clone)]
pub struct HeadlessPlatform {
    state: Shared,
    desktop: Bounds,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    /// A platform with a 1920x1080 primary screen.
    pub fn new() -> Self {
        Self::with_desktop(Bounds::new(0, 0, 1920, 1080))
    }

    /// A platform with a custom primary screen.
    pub fn with_desktop(desktop: Bounds) -> Self {
        Self { state: Shared::default(), desktop }
    }

    /// Simulate a foreign window at `bounds`. The new window takes the
    /// foreground, as freshly opened windows usually do.
    pub fn spawn_target(&self, bounds: Bounds) -> HeadlessTarget {
        let mut state = self.state.lock();
        let handle = state.allocate_handle(bounds);
        state.foreground = handle;
        HeadlessTarget { handle, state: Arc::clone(&self.state) }
    }

    /// Give the input focus to `handle`. [`WindowHandle::NULL`] models focus
    /// on the desktop.
    pub fn set_foreground(&self, handle: WindowHandle) {
        self.state.lock().foreground = handle;
    }

    /// Make the next overlay window creations fail.
    pub fn fail_window_creation(&self, fail: bool) {
        self.state.lock().fail_window_creation = fail;
    }

    /// Make the next device creations fail.
    pub fn fail_device_creation(&self, fail: bool) {
        self.state.lock().fail_device_creation = fail;
    }

    /// Native calls recorded so far.
    pub fn calls(&self) -> Vec<NativeCall> {
        self.state.lock().calls.clone()
    }

    /// Draw commands recorded so far.
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.state.lock().commands.clone()
    }

    /// Forget every recorded call and command.
    pub fn clear_log(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.commands.clear();
    }

    /// Number of frames presented by all devices.
    pub fn frames_presented(&self) -> usize {
        self.state.lock().frames_presented
    }

    /// Number of brushes, fonts and text layouts currently alive.
    pub fn live_resources(&self) -> usize {
        self.state.lock().live_resources
    }

    /// Number of live windows, overlays and targets alike.
    pub fn window_count(&self) -> usize {
        self.state.lock().windows.len()
    }
}

impl WindowPlatform for HeadlessPlatform {
    type Window = HeadlessWindow;
    type Device = HeadlessDevice;

    fn desktop_bounds(&self) -> Bounds {
        self.desktop
    }

    fn is_window(&self, handle: WindowHandle) -> bool {
        self.state.lock().windows.contains_key(&handle)
    }

    fn window_bounds(&self, handle: WindowHandle) -> Result<Bounds> {
        self.state
            .lock()
            .windows
            .get(&handle)
            .copied()
            .ok_or_else(|| Error::Backend(format!("no window with handle {handle:?}")))
    }

    fn create_window(&self, bounds: Bounds) -> Result<HeadlessWindow> {
        let mut state = self.state.lock();
        if state.fail_window_creation {
            return Err(Error::WindowCreation("simulated failure".into()));
        }

        let handle = state.allocate_handle(bounds);
        state.calls.push(NativeCall::CreateWindow(handle, bounds));
        trace!("Created headless window {handle:?}");

        Ok(HeadlessWindow { handle, state: Arc::clone(&self.state) })
    }

    fn create_device(
        &self,
        window: &HeadlessWindow,
        options: DeviceOptions,
    ) -> Result<HeadlessDevice> {
        let mut state = self.state.lock();
        if state.fail_device_creation {
            return Err(Error::DeviceCreation("simulated failure".into()));
        }

        state.calls.push(NativeCall::CreateDevice(window.handle));
        Ok(HeadlessDevice {
            owner: window.handle,
            size: options.size,
            limit_fps: options.limit_fps,
            drawing: false,
            state: Arc::clone(&self.state),
        })
    }
}

/// A simulated foreign window.
pub struct HeadlessTarget {
    handle: WindowHandle,
    state: Shared,
}

impl HeadlessTarget {
    /// Move or resize the window.
    pub fn set_bounds(&self, bounds: Bounds) {
        self.state.lock().windows.insert(self.handle, bounds);
    }

    /// Give the window the input focus.
    pub fn activate(&self) {
        self.state.lock().foreground = self.handle;
    }

    /// Move the input focus to the desktop.
    pub fn deactivate(&self) {
        let mut state = self.state.lock();
        if state.foreground == self.handle {
            state.foreground = WindowHandle::NULL;
        }
    }

    /// Destroy the window. Its handle stops being valid and it loses the
    /// input focus if it had it.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.windows.remove(&self.handle);
        if state.foreground == self.handle {
            state.foreground = WindowHandle::NULL;
        }
    }
}

impl TargetWindow for HeadlessTarget {
    fn handle(&self) -> WindowHandle {
        self.handle
    }

    fn bounds(&self) -> Result<Bounds> {
        self.state
            .lock()
            .windows
            .get(&self.handle)
            .copied()
            .ok_or_else(|| Error::Backend(format!("target window {:?} is gone", self.handle)))
    }

    fn is_activated(&self) -> bool {
        self.state.lock().foreground == self.handle
    }
}

/// Overlay window created by [`HeadlessPlatform`].
pub struct HeadlessWindow {
    handle: WindowHandle,
    state: Shared,
}

impl HeadlessWindow {
    fn record(&self, call: NativeCall) {
        self.state.lock().calls.push(call);
    }
}

impl NativeWindow for HeadlessWindow {
    fn handle(&self) -> WindowHandle {
        self.handle
    }

    fn set_bounds(&mut self, bounds: Bounds) -> Result<()> {
        let mut state = self.state.lock();
        state.windows.insert(self.handle, bounds);
        state.calls.push(NativeCall::SetBounds(self.handle, bounds));
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> Result<()> {
        self.record(NativeCall::SetVisible(self.handle, visible));
        Ok(())
    }

    fn extend_frame_into_client_area(&mut self) -> Result<()> {
        self.record(NativeCall::ExtendFrame(self.handle));
        Ok(())
    }

    fn pump_messages(&mut self) {
        self.record(NativeCall::PumpMessages(self.handle));
    }

    fn destroy(self) -> Result<()> {
        let mut state = self.state.lock();
        state.windows.remove(&self.handle);
        state.calls.push(NativeCall::DestroyWindow(self.handle));
        Ok(())
    }
}

/// A pooled resource that keeps the live resource count of its device.
pub struct HeadlessResource<T> {
    value: T,
    state: Shared,
}

impl<T> HeadlessResource<T> {
    fn new(value: T, state: &Shared) -> Self {
        state.lock().live_resources += 1;
        Self { value, state: Arc::clone(state) }
    }

    /// The recorded value.
    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> Drop for HeadlessResource<T> {
    fn drop(&mut self) {
        self.state.lock().live_resources -= 1;
    }
}

/// Drawing device created by [`HeadlessPlatform`].
pub struct HeadlessDevice {
    owner: WindowHandle,
    size: (u32, u32),
    limit_fps: bool,
    drawing: bool,
    state: Shared,
}

impl HeadlessDevice {
    /// A device bound to no window, with its own private log.
    pub fn detached(size: (u32, u32)) -> Self {
        Self {
            owner: WindowHandle::NULL,
            size,
            limit_fps: false,
            drawing: false,
            state: Shared::default(),
        }
    }

    /// Window the device draws to.
    pub fn owner(&self) -> WindowHandle {
        self.owner
    }

    /// Current surface size.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Whether presentation is synchronized with the display refresh.
    pub fn limit_fps(&self) -> bool {
        self.limit_fps
    }

    /// Draw commands recorded in this device's log.
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.state.lock().commands.clone()
    }

    /// Number of resources alive in this device's log.
    pub fn live_resources(&self) -> usize {
        self.state.lock().live_resources
    }

    /// Make the next `count` surface resizes fail, leaving the size unchanged.
    pub fn fail_resizes(&self, count: usize) {
        self.state.lock().failing_resizes = count;
    }

    /// Make the next `count` presents fail. The scene is still closed.
    pub fn fail_presents(&self, count: usize) {
        self.state.lock().failing_presents = count;
    }

    fn record(&self, command: DrawCommand) {
        debug_assert!(self.drawing, "{command:?} issued outside of begin_draw/end_draw");
        self.state.lock().commands.push(command);
    }
}

impl Drop for HeadlessDevice {
    fn drop(&mut self) {
        self.state.lock().calls.push(NativeCall::ReleaseDevice(self.owner));
    }
}

impl DrawDevice for HeadlessDevice {
    type Brush = HeadlessResource<Color>;
    type Font = HeadlessResource<FontDesc>;
    type TextLayout = HeadlessResource<String>;

    fn create_brush(&mut self, color: Color) -> Result<Self::Brush> {
        self.state.lock().commands.push(DrawCommand::CreateBrush(color));
        Ok(HeadlessResource::new(color, &self.state))
    }

    fn create_font(&mut self, font: &FontDesc) -> Result<Self::Font> {
        self.state.lock().commands.push(DrawCommand::CreateFont(font.clone()));
        Ok(HeadlessResource::new(font.clone(), &self.state))
    }

    fn create_text_layout(&mut self, text: &str, _font: &Self::Font) -> Result<Self::TextLayout> {
        self.state.lock().commands.push(DrawCommand::CreateTextLayout(text.to_owned()));
        Ok(HeadlessResource::new(text.to_owned(), &self.state))
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        debug_assert!(!self.drawing, "resize issued while drawing");
        let mut state = self.state.lock();
        if state.failing_resizes > 0 {
            state.failing_resizes -= 1;
            return Err(Error::Backend(format!("simulated resize failure to {width}x{height}")));
        }
        self.size = (width, height);
        state.commands.push(DrawCommand::Resize(width, height));
        Ok(())
    }

    fn begin_draw(&mut self) {
        self.drawing = true;
        self.record(DrawCommand::BeginDraw);
    }

    fn end_draw(&mut self) -> Result<()> {
        self.record(DrawCommand::EndDraw);
        self.drawing = false;
        let mut state = self.state.lock();
        if state.failing_presents > 0 {
            state.failing_presents -= 1;
            return Err(Error::Backend("simulated present failure".into()));
        }
        state.frames_presented += 1;
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.record(DrawCommand::Clear(color));
    }

    fn draw_line(&mut self, from: Point, to: Point, stroke: f32, brush: &Self::Brush) {
        self.record(DrawCommand::Line { from, to, stroke, brush: brush.value });
    }

    fn draw_rectangle(&mut self, rect: Rect, stroke: f32, brush: &Self::Brush) {
        self.record(DrawCommand::Rectangle { rect, stroke, brush: brush.value });
    }

    fn fill_rectangle(&mut self, rect: Rect, brush: &Self::Brush) {
        self.record(DrawCommand::FillRectangle { rect, brush: brush.value });
    }

    fn draw_ellipse(
        &mut self,
        center: Point,
        radius_x: f32,
        radius_y: f32,
        stroke: f32,
        brush: &Self::Brush,
    ) {
        let brush = brush.value;
        self.record(DrawCommand::Ellipse { center, radius_x, radius_y, stroke, brush });
    }

    fn fill_ellipse(&mut self, center: Point, radius_x: f32, radius_y: f32, brush: &Self::Brush) {
        self.record(DrawCommand::FillEllipse { center, radius_x, radius_y, brush: brush.value });
    }

    fn draw_text_layout(
        &mut self,
        origin: Point,
        layout: &Self::TextLayout,
        brush: &Self::Brush,
        snap: bool,
    ) {
        self.record(DrawCommand::Text {
            origin,
            text: layout.value.clone(),
            brush: brush.value,
            snap,
        });
    }
}
