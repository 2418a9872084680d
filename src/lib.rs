//! # hudlayer
//!
//! This library draws on transparent, click-through, always-on-top windows
//! laid over the window of another application, and keeps them aligned with
//! that window while it has the focus.
//!
//! Drawing goes through an immediate-mode 2D renderer backed by Direct2D and
//! DirectWrite, with a small, fixed set of primitives: lines, rectangles,
//! circles, boxes, bars, corner brackets and text.
//!
//! ## Architecture
//!
//! - [`timer::WaitTimer`] is an interval gate: it tells whether a given
//!   amount of time has elapsed since it was last reset.
//! - [`tick::TickEngine`] is called by the host on every iteration of its
//!   loop and throttles the expensive work to a fixed rate, running it as
//!   three ordered notifications: pre-tick, tick, post-tick.
//! - [`window::OverlayWindow`] owns the native overlay window and its
//!   [`renderer::Renderer`], and follows the bounds of a parent window.
//! - [`plugin::NativeOverlay`] wires everything together around a
//!   [`platform::TargetWindow`] and a [`plugin::Scene`].
//!
//! The operating system is only reached through the traits in [`platform`].
//! [`platform::win32`] is the real implementation; [`platform::headless`]
//! records calls instead of performing them and runs anywhere.
//!
//! ## Threading
//!
//! Nothing in this crate spawns threads or sleeps. Everything, pool
//! mutation included, must happen on the thread that calls
//! [`plugin::OverlayPlugin::update`].
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> hudlayer::Result<()> {
//! use hudlayer::config::JsonSettingsStore;
//! use hudlayer::logging::{setup_tracing, LogConfig};
//! use hudlayer::platform::win32::{Win32Platform, Win32Target};
//! use hudlayer::plugin::{NativeOverlayBuilder, OverlayPlugin, PluginInfo, Scene};
//! use hudlayer::renderer::{BrushId, DrawDevice, FontId, Renderer};
//! use hudlayer::WindowHandle;
//!
//! #[derive(Default)]
//! struct Hud {
//!     resources: Option<(BrushId, FontId)>,
//! }
//!
//! impl<D: DrawDevice> Scene<D> for Hud {
//!     fn initialize(&mut self, renderer: &mut Renderer<D>) -> hudlayer::Result<()> {
//!         let red = renderer.create_brush(0xffff0000)?;
//!         let font = renderer.create_font("Consolas", 16., false, false)?;
//!         self.resources = Some((red, font));
//!         Ok(())
//!     }
//!
//!     fn render(&mut self, renderer: &mut Renderer<D>) -> hudlayer::Result<()> {
//!         if let Some((red, font)) = self.resources {
//!             renderer.draw_edge(100., 100., 200., 120., 12., 2., red);
//!             renderer.draw_text("target", font, red, 100., 80., true)?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! setup_tracing(&LogConfig::default().with_file("hud.log"));
//!
//! # let target_handle = WindowHandle::NULL;
//! let mut overlay = NativeOverlayBuilder::new(Win32Platform, Hud::default())
//!     .with_info(PluginInfo::new("hud").with_name("Hud").with_version("0.1.0"))
//!     .with_settings_store(JsonSettingsStore::new("hud.json"))
//!     .build();
//!
//! overlay.initialize(Win32Target::new(target_handle)?)?;
//! overlay.enable()?;
//! loop {
//!     overlay.update()?;
//! }
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod platform;
pub mod plugin;
pub mod renderer;
pub mod tick;
pub mod timer;
#[cfg(windows)]
pub mod util;
pub mod window;

pub use error::{Error, Result};
pub use geometry::{Bounds, Color, Point, Rect, WindowHandle};
pub use tracing;
#[cfg(windows)]
pub use windows;
