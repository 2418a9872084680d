#![allow(dead_code)]

#[cfg(windows)]
pub mod win32;

use std::sync::Once;

use hudlayer::config::{MemorySettingsStore, OverlaySettings};
use hudlayer::logging::{setup_tracing as install, LogConfig};
use hudlayer::platform::headless::{HeadlessPlatform, HeadlessTarget};
use hudlayer::plugin::{NativeOverlay, NativeOverlayBuilder, PluginInfo, Scene};
use hudlayer::renderer::{BrushId, DrawDevice, FontId, Renderer};
use hudlayer::timer::ManualClock;
use hudlayer::Bounds;

pub const TARGET_BOUNDS: Bounds = Bounds::new(100, 100, 800, 600);

pub fn setup_tracing() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        install(&LogConfig::default().with_default_directive("hudlayer=trace"));
    });
}

/// A scene with a bit of everything: static labels drawn buffered, a frame
/// counter drawn unbuffered, and geometry.
#[derive(Default)]
pub struct DemoScene {
    pub resources: Option<(BrushId, BrushId, FontId)>,
    pub frames: usize,
    pub post_ticks: usize,
}

impl<D: DrawDevice> Scene<D> for DemoScene {
    fn initialize(&mut self, renderer: &mut Renderer<D>) -> hudlayer::Result<()> {
        let red = renderer.create_brush(0xffff0000)?;
        let red_opacity = renderer.create_brush(0x50ff0000)?;
        let font = renderer.create_font("Arial", 20., false, false)?;
        self.resources = Some((red, red_opacity, font));
        Ok(())
    }

    fn render(&mut self, renderer: &mut Renderer<D>) -> hudlayer::Result<()> {
        let Some((red, red_opacity, font)) = self.resources else {
            return Ok(());
        };
        self.frames += 1;

        renderer.draw_text("DrawBox2D", font, red, 350., 40., true)?;
        renderer.draw_box_2d(350., 70., 50., 100., 2., red, red_opacity);
        renderer.draw_text("DrawBarV", font, red, 50., 40., true)?;
        renderer.draw_bar_vertical(50., 70., 20., 100., 80., 2., red, red_opacity);
        renderer.draw_text(&format!("Frame {}", self.frames), font, red, 10., 10., false)?;
        Ok(())
    }

    fn post_tick(&mut self) -> hudlayer::Result<()> {
        self.post_ticks += 1;
        Ok(())
    }
}

pub type DemoOverlay = NativeOverlay<HeadlessPlatform, HeadlessTarget, DemoScene, ManualClock>;

pub fn demo_overlay(platform: &HeadlessPlatform, clock: &ManualClock, rate: u64) -> DemoOverlay {
    let settings = OverlaySettings { update_rate_millis: rate, ..Default::default() };
    NativeOverlayBuilder::new(platform.clone(), DemoScene::default())
        .with_info(
            PluginInfo::new("demo-overlay")
                .with_author("hudlayer")
                .with_name("Demo overlay")
                .with_version("1.0.0")
                .with_description("Draws a few primitives"),
        )
        .with_settings_store(MemorySettingsStore::new(settings))
        .with_clock(clock.clone())
        .build()
}
