//! Immediate-mode 2D renderer.
//!
//! A [`Renderer`] owns a [`DrawDevice`] bound to an overlay window and three
//! resource pools: brushes, fonts and cached text layouts. Resources are
//! addressed by typed handles ([`BrushId`], [`FontId`], [`LayoutId`]) that are
//! plain indices, assigned in creation order and valid until their pool is
//! cleared.
//!
//! Drawing happens inside a scene bracket:
//!
//! ```no_run
//! # fn frame<D: hudlayer::renderer::DrawDevice>(
//! #     renderer: &mut hudlayer::renderer::Renderer<D>,
//! # ) -> hudlayer::Result<()> {
//! let red = renderer.create_brush(0xffff0000)?;
//! let font = renderer.create_font("Arial", 20.0, false, false)?;
//!
//! renderer.begin_scene()?;
//! renderer.clear_scene();
//! renderer.draw_rectangle(10., 10., 50., 100., 2., red);
//! renderer.draw_text("Hello", font, red, 10., 120., true)?;
//! renderer.end_scene()?;
//! # Ok(())
//! # }
//! ```
//!
//! Resizes requested through [`Renderer::request_resize`] are never applied
//! while a scene is being recorded; they are applied at the next scene
//! boundary.
//!
//! The text layout cache is keyed by exact string content and grows until
//! [`Renderer::clear_text_layouts`] is called. Hosts that draw many distinct
//! strings (counters, timers) should draw those unbuffered or clear the cache
//! periodically.

#[cfg(windows)]
pub mod d2d;

use tracing::{debug, error, trace};

use crate::geometry::{Color, Point, Rect};
use crate::Result;

/// Font request passed to [`DrawDevice::create_font`].
#[derive(Debug, Clone, PartialEq)]
pub struct FontDesc {
    /// Family name, e.g. `Arial`.
    pub family: String,
    /// Size in device-independent units.
    pub size: f32,
    /// Bold weight.
    pub bold: bool,
    /// Italic style.
    pub italic: bool,
}

/// Parameters for creating a [`DrawDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Initial surface size in pixels.
    pub size: (u32, u32),
    /// Present in sync with the display refresh instead of immediately.
    pub limit_fps: bool,
}

/// The drawing backend a [`Renderer`] issues commands to.
///
/// Implementors wrap a GPU-backed surface bound to a single window. Drawing
/// methods are only ever called between [`begin_draw`](Self::begin_draw) and
/// [`end_draw`](Self::end_draw), and [`resize`](Self::resize) only outside of
/// that bracket.
pub trait DrawDevice {
    /// Solid color brush.
    type Brush;
    /// Text format.
    type Font;
    /// Shaped, ready to draw text.
    type TextLayout;

    /// Create a solid color brush.
    fn create_brush(&mut self, color: Color) -> Result<Self::Brush>;
    /// Create a text format.
    fn create_font(&mut self, font: &FontDesc) -> Result<Self::Font>;
    /// Lay out `text` with `font`: leading aligned, unwrapped, unbounded.
    fn create_text_layout(&mut self, text: &str, font: &Self::Font) -> Result<Self::TextLayout>;

    /// Resize the backing surface.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;
    /// Start recording draw commands.
    fn begin_draw(&mut self);
    /// Submit and present the recorded commands.
    fn end_draw(&mut self) -> Result<()>;

    /// Fill the whole surface with `color`, replacing its contents.
    fn clear(&mut self, color: Color);
    /// Stroke a line segment.
    fn draw_line(&mut self, from: Point, to: Point, stroke: f32, brush: &Self::Brush);
    /// Stroke a rectangle outline.
    fn draw_rectangle(&mut self, rect: Rect, stroke: f32, brush: &Self::Brush);
    /// Fill a rectangle.
    fn fill_rectangle(&mut self, rect: Rect, brush: &Self::Brush);
    /// Stroke an ellipse outline.
    fn draw_ellipse(
        &mut self,
        center: Point,
        radius_x: f32,
        radius_y: f32,
        stroke: f32,
        brush: &Self::Brush,
    );
    /// Fill an ellipse.
    fn fill_ellipse(&mut self, center: Point, radius_x: f32, radius_y: f32, brush: &Self::Brush);
    /// Draw a text layout with its top-left corner at `origin`.
    fn draw_text_layout(
        &mut self,
        origin: Point,
        layout: &Self::TextLayout,
        brush: &Self::Brush,
        snap: bool,
    );
}

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            /// Position of the resource in its pool.
            pub fn index(&self) -> usize {
                self.0
            }
        }
    };
}

resource_id! {
    /// Handle to a pooled brush.
    BrushId
}

resource_id! {
    /// Handle to a pooled font.
    FontId
}

resource_id! {
    /// Handle to a cached text layout.
    LayoutId
}

/// Growable resource collection addressed by index.
struct Pool<T> {
    kind: &'static str,
    items: Vec<T>,
    buffer_size: usize,
}

impl<T> Pool<T> {
    const INITIAL_CAPACITY: usize = 32;

    fn new(kind: &'static str) -> Self {
        Self { kind, items: Vec::with_capacity(Self::INITIAL_CAPACITY), buffer_size: 0 }
    }

    fn push(&mut self, item: T) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    fn get(&self, index: usize) -> &T {
        match self.items.get(index) {
            Some(item) => item,
            None => panic!(
                "{} handle {index} is out of range (pool holds {})",
                self.kind,
                self.items.len()
            ),
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    // Drops every resource and keeps the old size as a capacity hint.
    fn clear(&mut self) {
        self.buffer_size = self.items.len();
        self.items = Vec::with_capacity(self.buffer_size);
        debug!("Cleared {} pool ({} entries)", self.kind, self.buffer_size);
    }
}

struct CachedLayout<L> {
    text: String,
    layout: L,
}

/// Immediate-mode renderer. See the [module documentation](self).
pub struct Renderer<D: DrawDevice> {
    // Pools are declared before the device so they are released first.
    brushes: Pool<D::Brush>,
    fonts: Pool<D::Font>,
    layouts: Pool<CachedLayout<D::TextLayout>>,
    device: D,
    size: (u32, u32),
    pending_resize: Option<(u32, u32)>,
    in_scene: bool,
}

impl<D: DrawDevice> Renderer<D> {
    /// Wrap a device whose surface currently measures `size`.
    pub fn new(device: D, size: (u32, u32)) -> Self {
        Self {
            brushes: Pool::new("brush"),
            fonts: Pool::new("font"),
            layouts: Pool::new("text layout"),
            device,
            size,
            pending_resize: None,
            in_scene: false,
        }
    }

    /// The underlying device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Current surface size. A pending resize is not reflected until applied.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Whether a scene is being recorded.
    pub fn in_scene(&self) -> bool {
        self.in_scene
    }

    /// Whether a resize is waiting for the next scene boundary.
    pub fn has_pending_resize(&self) -> bool {
        self.pending_resize.is_some()
    }

    /// Ask for the surface to be resized at the next scene boundary.
    ///
    /// Repeated requests before the boundary collapse into the last one.
    pub fn request_resize(&mut self, width: u32, height: u32) {
        self.pending_resize = Some((width, height));
    }

    // The request stays pending until the device accepts it.
    fn apply_pending_resize(&mut self) -> Result<()> {
        if let Some((width, height)) = self.pending_resize {
            debug!("Resizing surface to {width}x{height}");
            self.device.resize(width, height)?;
            self.size = (width, height);
            self.pending_resize = None;
        }
        Ok(())
    }

    /// Add a solid color brush to the pool.
    pub fn create_brush(&mut self, color: impl Into<Color>) -> Result<BrushId> {
        let brush = self.device.create_brush(color.into())?;
        Ok(BrushId(self.brushes.push(brush)))
    }

    /// Add a font to the pool.
    pub fn create_font(
        &mut self,
        family: &str,
        size: f32,
        bold: bool,
        italic: bool,
    ) -> Result<FontId> {
        let desc = FontDesc { family: family.to_owned(), size, bold, italic };
        let font = self.device.create_font(&desc)?;
        Ok(FontId(self.fonts.push(font)))
    }

    /// Release every brush. All [`BrushId`]s issued so far become invalid.
    ///
    /// Call this between scenes if brushes are created inside the frame loop.
    pub fn clear_brushes(&mut self) {
        self.brushes.clear();
    }

    /// Release every font. All [`FontId`]s issued so far become invalid.
    pub fn clear_fonts(&mut self) {
        self.fonts.clear();
    }

    /// Release every cached text layout.
    ///
    /// Call this after changing fonts, or periodically to bound the memory
    /// used by the cache.
    pub fn clear_text_layouts(&mut self) {
        self.layouts.clear();
    }

    /// Number of brushes in the pool.
    pub fn brush_count(&self) -> usize {
        self.brushes.len()
    }

    /// Number of fonts in the pool.
    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Number of cached text layouts.
    pub fn text_layout_count(&self) -> usize {
        self.layouts.len()
    }

    /// Brush pool size recorded by the last [`clear_brushes`](Self::clear_brushes).
    pub fn buffer_brush_size(&self) -> usize {
        self.brushes.buffer_size
    }

    /// Font pool size recorded by the last [`clear_fonts`](Self::clear_fonts).
    pub fn buffer_font_size(&self) -> usize {
        self.fonts.buffer_size
    }

    /// Layout cache size recorded by the last
    /// [`clear_text_layouts`](Self::clear_text_layouts).
    pub fn buffer_layout_size(&self) -> usize {
        self.layouts.buffer_size
    }

    /// Find the cached layout for `text`.
    ///
    /// This is a linear scan by string equality.
    pub fn cached_layout(&self, text: &str) -> Option<LayoutId> {
        self.layouts.items.iter().position(|cached| cached.text == text).map(LayoutId)
    }

    /// Open the scene bracket, applying any pending resize first.
    pub fn begin_scene(&mut self) -> Result<()> {
        assert!(!self.in_scene, "begin_scene called while a scene is already open");
        self.apply_pending_resize()?;
        self.device.begin_draw();
        self.in_scene = true;
        Ok(())
    }

    /// Close the scene bracket and present it.
    ///
    /// A resize requested while the scene was open is applied afterwards, even
    /// if presenting failed. When both fail, the present error is returned and
    /// the resize error is logged.
    pub fn end_scene(&mut self) -> Result<()> {
        assert!(self.in_scene, "end_scene called without begin_scene");
        self.in_scene = false;
        let presented = self.device.end_draw();
        let resized = self.apply_pending_resize();
        if let (Err(_), Err(e)) = (&presented, &resized) {
            error!("Deferred resize failed after a failed present: {e}");
        }
        trace!("Scene presented");
        presented.and(resized)
    }

    /// Reset the surface to fully transparent.
    pub fn clear_scene(&mut self) {
        self.ensure_scene("clear_scene");
        self.device.clear(Color::TRANSPARENT);
    }

    fn ensure_scene(&self, operation: &str) {
        assert!(self.in_scene, "{operation} called outside of begin_scene/end_scene");
    }

    fn line(&mut self, from: Point, to: Point, stroke: f32, brush: BrushId) {
        let brush = self.brushes.get(brush.0);
        self.device.draw_line(from, to, stroke, brush);
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: f32, brush: BrushId) {
        let brush = self.brushes.get(brush.0);
        self.device.draw_rectangle(rect, stroke, brush);
    }

    fn fill_rect(&mut self, rect: Rect, brush: BrushId) {
        let brush = self.brushes.get(brush.0);
        self.device.fill_rectangle(rect, brush);
    }

    fn stroke_circle(&mut self, center: Point, radius: f32, stroke: f32, brush: BrushId) {
        let brush = self.brushes.get(brush.0);
        self.device.draw_ellipse(center, radius, radius, stroke, brush);
    }

    /// Stroke a line from `(x1, y1)` to `(x2, y2)`.
    pub fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, stroke: f32, brush: BrushId) {
        self.ensure_scene("draw_line");
        self.line(Point::new(x1, y1), Point::new(x2, y2), stroke, brush);
    }

    /// Stroke a rectangle outline.
    pub fn draw_rectangle(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        stroke: f32,
        brush: BrushId,
    ) {
        self.ensure_scene("draw_rectangle");
        self.stroke_rect(Rect::from_xywh(x, y, width, height), stroke, brush);
    }

    /// Fill a rectangle.
    pub fn fill_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32, brush: BrushId) {
        self.ensure_scene("fill_rectangle");
        self.fill_rect(Rect::from_xywh(x, y, width, height), brush);
    }

    /// Stroke a circle outline centered on `(x, y)`.
    pub fn draw_circle(&mut self, x: f32, y: f32, radius: f32, stroke: f32, brush: BrushId) {
        self.ensure_scene("draw_circle");
        self.stroke_circle(Point::new(x, y), radius, stroke, brush);
    }

    /// Fill a circle centered on `(x, y)`.
    pub fn fill_circle(&mut self, x: f32, y: f32, radius: f32, brush: BrushId) {
        self.ensure_scene("fill_circle");
        let brush = self.brushes.get(brush.0);
        self.device.fill_ellipse(Point::new(x, y), radius, radius, brush);
    }

    /// Stroked outer rectangle with an interior filled `stroke` pixels inside
    /// it on every side.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_box_2d(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        stroke: f32,
        brush: BrushId,
        interior_brush: BrushId,
    ) {
        self.ensure_scene("draw_box_2d");
        let outer = Rect::from_xywh(x, y, width, height);
        self.stroke_rect(outer, stroke, brush);
        self.fill_rect(outer.inset(stroke), interior_brush);
    }

    /// Filled isometric box: front face at `(x, y)`, back face offset by
    /// `depth` to the upper right, corners joined by four edges.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_box_3d(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        depth: f32,
        stroke: f32,
        brush: BrushId,
        interior_brush: BrushId,
    ) {
        self.ensure_scene("draw_box_3d");
        let front = Rect::from_xywh(x, y, width, height);
        let back = front.offset(depth, -depth);

        self.fill_rect(back, interior_brush);
        self.fill_rect(front, interior_brush);
        self.isometric_outline(front, back, stroke, brush);
    }

    /// Outline of an isometric box, as [`draw_box_3d`](Self::draw_box_3d)
    /// without the fill.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_rectangle_3d(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        depth: f32,
        stroke: f32,
        brush: BrushId,
    ) {
        self.ensure_scene("draw_rectangle_3d");
        let front = Rect::from_xywh(x, y, width, height);
        let back = front.offset(depth, -depth);

        self.isometric_outline(front, back, stroke, brush);
    }

    fn isometric_outline(&mut self, front: Rect, back: Rect, stroke: f32, brush: BrushId) {
        self.stroke_rect(front, stroke, brush);
        self.stroke_rect(back, stroke, brush);

        let corners = [
            (Point::new(front.left, front.top), Point::new(back.left, back.top)),
            (Point::new(front.right, front.top), Point::new(back.right, back.top)),
            (Point::new(front.right, front.bottom), Point::new(back.right, back.bottom)),
            (Point::new(front.left, front.bottom), Point::new(back.left, back.bottom)),
        ];
        for (from, to) in corners {
            self.line(from, to, stroke, brush);
        }
    }

    /// Plus-shaped marker centered on `(x, y)` with arms `length` long.
    pub fn draw_plus(&mut self, x: f32, y: f32, length: f32, stroke: f32, brush: BrushId) {
        self.ensure_scene("draw_plus");
        self.line(Point::new(x - length, y), Point::new(x + length, y), stroke, brush);
        self.line(Point::new(x, y - length), Point::new(x, y + length), stroke, brush);
    }

    /// Four L-shaped brackets, one per corner of the rectangle, each arm
    /// `length` long.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_edge(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        length: f32,
        stroke: f32,
        brush: BrushId,
    ) {
        self.ensure_scene("draw_edge");
        let (right, bottom) = (x + width, y + height);

        // (corner, horizontal direction, vertical direction)
        let corners =
            [(x, y, 1., 1.), (x, bottom, 1., -1.), (right, y, -1., 1.), (right, bottom, -1., -1.)];
        for (cx, cy, dx, dy) in corners {
            let corner = Point::new(cx, cy);
            self.line(corner, Point::new(cx, cy + dy * length), stroke, brush);
            self.line(corner, Point::new(cx + dx * length, cy), stroke, brush);
        }
    }

    /// Horizontal progress bar: stroked frame, filled from the left edge to
    /// `value` percent of the width.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_bar_horizontal(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        value: f32,
        stroke: f32,
        brush: BrushId,
        interior_brush: BrushId,
    ) {
        self.ensure_scene("draw_bar_horizontal");
        let frame = Rect::from_xywh(x, y, width, height);
        self.stroke_rect(frame, stroke, brush);

        let value = value.clamp(0., 100.);
        if value > 0. {
            let fill = Rect { right: frame.left + width * value / 100., ..frame };
            self.fill_rect(fill, interior_brush);
        }
    }

    /// Vertical progress bar: stroked frame, filled from the bottom edge to
    /// `value` percent of the height.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_bar_vertical(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        value: f32,
        stroke: f32,
        brush: BrushId,
        interior_brush: BrushId,
    ) {
        self.ensure_scene("draw_bar_vertical");
        let frame = Rect::from_xywh(x, y, width, height);
        self.stroke_rect(frame, stroke, brush);

        let value = value.clamp(0., 100.);
        if value > 0. {
            let fill = Rect { top: frame.bottom - height * value / 100., ..frame };
            self.fill_rect(fill, interior_brush);
        }
    }

    /// Line with a `border_brush` outline above, below and across both ends.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_bordered_line(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        stroke: f32,
        brush: BrushId,
        border_brush: BrushId,
    ) {
        self.ensure_scene("draw_bordered_line");
        self.line(Point::new(x1, y1), Point::new(x2, y2), stroke, brush);

        self.line(Point::new(x1, y1 - stroke), Point::new(x2, y2 - stroke), stroke, border_brush);
        self.line(Point::new(x1, y1 + stroke), Point::new(x2, y2 + stroke), stroke, border_brush);

        let cap = stroke * 1.5;
        let half = stroke / 2.;
        self.line(
            Point::new(x1 - half, y1 - cap),
            Point::new(x1 - half, y1 + cap),
            stroke,
            border_brush,
        );
        self.line(
            Point::new(x2 - half, y2 - cap),
            Point::new(x2 - half, y2 + cap),
            stroke,
            border_brush,
        );
    }

    /// Rectangle outline framed on both sides by a thinner `border_brush`
    /// outline.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_bordered_rectangle(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        stroke: f32,
        border_stroke: f32,
        brush: BrushId,
        border_brush: BrushId,
    ) {
        self.ensure_scene("draw_bordered_rectangle");
        let rect = Rect::from_xywh(x, y, width, height);
        let spread = stroke - border_stroke;

        self.stroke_rect(rect.inset(-spread), border_stroke, border_brush);
        self.stroke_rect(rect, stroke, brush);
        self.stroke_rect(rect.inset(spread), border_stroke, border_brush);
    }

    /// Circle outline framed inside and out by `border_brush` circles.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_bordered_circle(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        stroke: f32,
        brush: BrushId,
        border_brush: BrushId,
    ) {
        self.ensure_scene("draw_bordered_circle");
        let center = Point::new(x, y);
        self.stroke_circle(center, radius + stroke, stroke, border_brush);
        self.stroke_circle(center, radius, stroke, brush);
        self.stroke_circle(center, radius - stroke, stroke, border_brush);
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    ///
    /// With `buffered`, the layout is looked up in the cache by exact string
    /// content and created and cached on a miss; the font of a cache hit is
    /// the one the layout was created with. Without `buffered`, a transient
    /// layout is created, drawn and released; use this for text that changes
    /// every frame.
    pub fn draw_text(
        &mut self,
        text: &str,
        font: FontId,
        brush: BrushId,
        x: f32,
        y: f32,
        buffered: bool,
    ) -> Result<()> {
        self.ensure_scene("draw_text");
        let origin = Point::new(x, y);
        let font = self.fonts.get(font.0);
        let brush = self.brushes.get(brush.0);

        if buffered {
            let index = match self.cached_layout(text) {
                Some(id) => id.0,
                None => {
                    let layout = self.device.create_text_layout(text, font)?;
                    trace!("Caching text layout for {text:?}");
                    self.layouts.push(CachedLayout { text: text.to_owned(), layout })
                },
            };
            let layout = &self.layouts.get(index).layout;
            self.device.draw_text_layout(origin, layout, brush, false);
        } else {
            let layout = self.device.create_text_layout(text, font)?;
            self.device.draw_text_layout(origin, &layout, brush, true);
        }

        Ok(())
    }
}

impl<D: DrawDevice> Drop for Renderer<D> {
    fn drop(&mut self) {
        debug!(
            "Releasing renderer ({} brushes, {} fonts, {} text layouts)",
            self.brushes.len(),
            self.fonts.len(),
            self.layouts.len()
        );
    }
}
