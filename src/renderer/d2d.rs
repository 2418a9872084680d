//! Direct2D drawing device.
//!
//! Draws to an `ID2D1HwndRenderTarget` bound to the overlay window, with a
//! premultiplied-alpha BGRA surface so that cleared pixels are fully
//! transparent on the layered window. Text goes through DirectWrite.

use tracing::debug;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct2D::Common::{
    D2D1_ALPHA_MODE_PREMULTIPLIED, D2D1_COLOR_F, D2D1_PIXEL_FORMAT, D2D_POINT_2F, D2D_RECT_F,
    D2D_SIZE_U,
};
use windows::Win32::Graphics::Direct2D::{
    D2D1CreateFactory, ID2D1Factory, ID2D1HwndRenderTarget, ID2D1SolidColorBrush,
    D2D1_ANTIALIAS_MODE_ALIASED, D2D1_DRAW_TEXT_OPTIONS_NONE, D2D1_DRAW_TEXT_OPTIONS_NO_SNAP,
    D2D1_ELLIPSE, D2D1_FACTORY_TYPE_SINGLE_THREADED, D2D1_FEATURE_LEVEL_DEFAULT,
    D2D1_HWND_RENDER_TARGET_PROPERTIES, D2D1_PRESENT_OPTIONS_IMMEDIATELY,
    D2D1_PRESENT_OPTIONS_NONE, D2D1_RENDER_TARGET_PROPERTIES, D2D1_RENDER_TARGET_TYPE_HARDWARE,
    D2D1_RENDER_TARGET_USAGE_NONE, D2D1_TEXT_ANTIALIAS_MODE_ALIASED,
};
use windows::Win32::Graphics::DirectWrite::{
    DWriteCreateFactory, IDWriteFactory, IDWriteTextFormat, IDWriteTextLayout,
    DWRITE_FACTORY_TYPE_SHARED, DWRITE_FONT_STRETCH_NORMAL, DWRITE_FONT_STYLE_ITALIC,
    DWRITE_FONT_STYLE_NORMAL, DWRITE_FONT_WEIGHT_BOLD, DWRITE_FONT_WEIGHT_NORMAL,
    DWRITE_TEXT_ALIGNMENT_LEADING, DWRITE_WORD_WRAPPING_NO_WRAP,
};
use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_B8G8R8A8_UNORM;

use crate::geometry::{Color, Point, Rect};
use crate::renderer::{DeviceOptions, DrawDevice, FontDesc};
use crate::util;
use crate::{Error, Result};

fn color(c: Color) -> D2D1_COLOR_F {
    D2D1_COLOR_F { r: c.r, g: c.g, b: c.b, a: c.a }
}

fn point(p: Point) -> D2D_POINT_2F {
    D2D_POINT_2F { x: p.x, y: p.y }
}

fn rect(r: Rect) -> D2D_RECT_F {
    D2D_RECT_F { left: r.left, top: r.top, right: r.right, bottom: r.bottom }
}

fn ellipse(center: Point, radius_x: f32, radius_y: f32) -> D2D1_ELLIPSE {
    D2D1_ELLIPSE { point: point(center), radiusX: radius_x, radiusY: radius_y }
}

/// [`DrawDevice`] backed by Direct2D and DirectWrite.
pub struct D2DDevice {
    target: ID2D1HwndRenderTarget,
    write_factory: IDWriteFactory,
    // Keeps the factory alive for as long as the target.
    _factory: ID2D1Factory,
}

impl D2DDevice {
    /// Bind a hardware render target to `hwnd`.
    pub fn new(hwnd: HWND, options: DeviceOptions) -> Result<Self> {
        Self::create(hwnd, options).map_err(|e| Error::DeviceCreation(e.to_string()))
    }

    fn create(hwnd: HWND, options: DeviceOptions) -> windows::core::Result<Self> {
        let (width, height) = options.size;
        let present_options = if options.limit_fps {
            D2D1_PRESENT_OPTIONS_NONE
        } else {
            D2D1_PRESENT_OPTIONS_IMMEDIATELY
        };

        let render_target_properties = D2D1_RENDER_TARGET_PROPERTIES {
            r#type: D2D1_RENDER_TARGET_TYPE_HARDWARE,
            pixelFormat: D2D1_PIXEL_FORMAT {
                format: DXGI_FORMAT_B8G8R8A8_UNORM,
                alphaMode: D2D1_ALPHA_MODE_PREMULTIPLIED,
            },
            dpiX: 0.,
            dpiY: 0.,
            usage: D2D1_RENDER_TARGET_USAGE_NONE,
            minLevel: D2D1_FEATURE_LEVEL_DEFAULT,
        };
        let hwnd_properties = D2D1_HWND_RENDER_TARGET_PROPERTIES {
            hwnd,
            pixelSize: D2D_SIZE_U { width, height },
            presentOptions: present_options,
        };

        unsafe {
            let factory: ID2D1Factory = D2D1CreateFactory(D2D1_FACTORY_TYPE_SINGLE_THREADED, None)?;
            let write_factory: IDWriteFactory = DWriteCreateFactory(DWRITE_FACTORY_TYPE_SHARED)?;
            let target =
                factory.CreateHwndRenderTarget(&render_target_properties, &hwnd_properties)?;

            target.SetAntialiasMode(D2D1_ANTIALIAS_MODE_ALIASED);
            target.SetTextAntialiasMode(D2D1_TEXT_ANTIALIAS_MODE_ALIASED);

            debug!("Created Direct2D render target {width}x{height} for {hwnd:?}");
            Ok(Self { target, write_factory, _factory: factory })
        }
    }
}

impl DrawDevice for D2DDevice {
    type Brush = ID2D1SolidColorBrush;
    type Font = IDWriteTextFormat;
    type TextLayout = IDWriteTextLayout;

    fn create_brush(&mut self, c: Color) -> Result<ID2D1SolidColorBrush> {
        Ok(unsafe { self.target.CreateSolidColorBrush(&color(c), None)? })
    }

    fn create_font(&mut self, font: &FontDesc) -> Result<IDWriteTextFormat> {
        let family = util::wide(&font.family);
        let weight = if font.bold { DWRITE_FONT_WEIGHT_BOLD } else { DWRITE_FONT_WEIGHT_NORMAL };
        let style = if font.italic { DWRITE_FONT_STYLE_ITALIC } else { DWRITE_FONT_STYLE_NORMAL };

        unsafe {
            let format = self.write_factory.CreateTextFormat(
                PCWSTR(family.as_ptr()),
                None,
                weight,
                style,
                DWRITE_FONT_STRETCH_NORMAL,
                font.size,
                w!("en-us"),
            )?;
            format.SetTextAlignment(DWRITE_TEXT_ALIGNMENT_LEADING)?;
            format.SetWordWrapping(DWRITE_WORD_WRAPPING_NO_WRAP)?;
            Ok(format)
        }
    }

    fn create_text_layout(
        &mut self,
        text: &str,
        font: &IDWriteTextFormat,
    ) -> Result<IDWriteTextLayout> {
        let text: Vec<u16> = text.encode_utf16().collect();
        Ok(unsafe { self.write_factory.CreateTextLayout(&text, font, f32::MAX, f32::MAX)? })
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe { self.target.Resize(&D2D_SIZE_U { width, height })? };
        Ok(())
    }

    fn begin_draw(&mut self) {
        unsafe { self.target.BeginDraw() };
    }

    fn end_draw(&mut self) -> Result<()> {
        unsafe { self.target.EndDraw(None, None)? };
        Ok(())
    }

    fn clear(&mut self, c: Color) {
        unsafe { self.target.Clear(Some(&color(c))) };
    }

    fn draw_line(&mut self, from: Point, to: Point, stroke: f32, brush: &ID2D1SolidColorBrush) {
        unsafe { self.target.DrawLine(point(from), point(to), brush, stroke, None) };
    }

    fn draw_rectangle(&mut self, r: Rect, stroke: f32, brush: &ID2D1SolidColorBrush) {
        unsafe { self.target.DrawRectangle(&rect(r), brush, stroke, None) };
    }

    fn fill_rectangle(&mut self, r: Rect, brush: &ID2D1SolidColorBrush) {
        unsafe { self.target.FillRectangle(&rect(r), brush) };
    }

    fn draw_ellipse(
        &mut self,
        center: Point,
        radius_x: f32,
        radius_y: f32,
        stroke: f32,
        brush: &ID2D1SolidColorBrush,
    ) {
        let ellipse = ellipse(center, radius_x, radius_y);
        unsafe { self.target.DrawEllipse(&ellipse, brush, stroke, None) };
    }

    fn fill_ellipse(
        &mut self,
        center: Point,
        radius_x: f32,
        radius_y: f32,
        brush: &ID2D1SolidColorBrush,
    ) {
        let ellipse = ellipse(center, radius_x, radius_y);
        unsafe { self.target.FillEllipse(&ellipse, brush) };
    }

    fn draw_text_layout(
        &mut self,
        origin: Point,
        layout: &IDWriteTextLayout,
        brush: &ID2D1SolidColorBrush,
        snap: bool,
    ) {
        let options =
            if snap { D2D1_DRAW_TEXT_OPTIONS_NONE } else { D2D1_DRAW_TEXT_OPTIONS_NO_SNAP };
        unsafe { self.target.DrawTextLayout(point(origin), layout, brush, options) };
    }
}
