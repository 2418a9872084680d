//! Overlay plugin lifecycle.
//!
//! A plugin ties a [`TickEngine`], an [`OverlayWindow`] and its [`Renderer`]
//! to a [`TargetWindow`]. The host drives it from its own loop:
//!
//! ```no_run
//! # use hudlayer::platform::headless::HeadlessPlatform;
//! # use hudlayer::plugin::{NativeOverlayBuilder, OverlayPlugin, PluginInfo, Scene};
//! # use hudlayer::renderer::{DrawDevice, Renderer};
//! # struct Crosshair;
//! # impl<D: DrawDevice> Scene<D> for Crosshair {
//! #     fn render(&mut self, _: &mut Renderer<D>) -> hudlayer::Result<()> { Ok(()) }
//! # }
//! # fn main() -> hudlayer::Result<()> {
//! # let platform = HeadlessPlatform::new();
//! # let target = platform.spawn_target(hudlayer::Bounds::new(0, 0, 800, 600));
//! let mut overlay = NativeOverlayBuilder::new(platform, Crosshair)
//!     .with_info(PluginInfo::new("crosshair").with_name("Crosshair"))
//!     .build();
//!
//! overlay.initialize(target)?;
//! overlay.enable()?;
//! loop {
//!     overlay.update()?;
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Every [`update`](OverlayPlugin::update) pulses the engine. When the
//! interval has elapsed, the pre-tick reconciles the overlay with the target
//! (visibility follows the target's focus, geometry follows its bounds), the
//! tick renders the [`Scene`] if the overlay is visible, and the post-tick
//! hands control back to the scene.

use tracing::{debug, error, info, trace};

use crate::config::{MemorySettingsStore, OverlaySettings, SettingsStore};
use crate::platform::{TargetWindow, WindowPlatform};
use crate::renderer::{DrawDevice, Renderer};
use crate::tick::{TickEngine, TickHandler};
use crate::timer::{Clock, SystemClock};
use crate::window::OverlayWindow;
use crate::{Error, Result};

/// Descriptive metadata of an overlay plugin.
///
/// Written into the settings at initialization; it has no effect on
/// behavior.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    /// Unique identifier.
    pub identifier: String,
    /// Author.
    pub author: String,
    /// Display name.
    pub name: String,
    /// Version.
    pub version: String,
    /// Description.
    pub description: String,
}

impl PluginInfo {
    /// Metadata with only an identifier.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), ..Default::default() }
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn write_into(&self, settings: &mut OverlaySettings) {
        settings.identifier = self.identifier.clone();
        settings.author = self.author.clone();
        settings.name = self.name.clone();
        settings.version = self.version.clone();
        settings.description = self.description.clone();
    }
}

/// The content an overlay draws.
///
/// Generic over the device so a scene can run on any backend.
pub trait Scene<D: DrawDevice> {
    /// Create long-lived resources. Called once, right after the renderer is
    /// created.
    fn initialize(&mut self, renderer: &mut Renderer<D>) -> Result<()> {
        let _ = renderer;
        Ok(())
    }

    /// Draw one frame. The scene is already open and cleared.
    fn render(&mut self, renderer: &mut Renderer<D>) -> Result<()>;

    /// Called at the end of every tick, visible or not.
    fn post_tick(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Lifecycle of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Created, no target bound yet.
    Uninitialized,
    /// Target bound and overlay created, not ticking.
    Initialized,
    /// Ticking.
    Enabled,
    /// Not ticking, resources retained.
    Disabled,
    /// Resources released. Terminal.
    Disposed,
}

impl PluginState {
    /// Lowercase name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginState::Uninitialized => "uninitialized",
            PluginState::Initialized => "initialized",
            PluginState::Enabled => "enabled",
            PluginState::Disabled => "disabled",
            PluginState::Disposed => "disposed",
        }
    }
}

/// Capability interface of an overlay plugin.
pub trait OverlayPlugin {
    /// The window type the plugin follows.
    type Target;

    /// Bind the target and create the overlay.
    fn initialize(&mut self, target: Self::Target) -> Result<()>;

    /// Start ticking.
    fn enable(&mut self) -> Result<()>;

    /// Stop ticking. The overlay and its last frame stay as they are.
    fn disable(&mut self) -> Result<()>;

    /// Pulse the tick engine. Returns whether a tick fired.
    fn update(&mut self) -> Result<bool>;

    /// Release every native resource. Idempotent and irreversible.
    fn dispose(&mut self) -> Result<()>;

    /// Whether the plugin is ticking.
    fn is_enabled(&self) -> bool;
}

/// Builder for [`NativeOverlay`].
pub struct NativeOverlayBuilder<P, S, C = SystemClock> {
    platform: P,
    scene: S,
    info: PluginInfo,
    settings: Box<dyn SettingsStore>,
    clock: C,
}

impl<P, S> NativeOverlayBuilder<P, S> {
    /// Start building a plugin that draws `scene` on `platform`.
    pub fn new(platform: P, scene: S) -> Self {
        Self {
            platform,
            scene,
            info: PluginInfo::default(),
            settings: Box::new(MemorySettingsStore::default()),
            clock: SystemClock,
        }
    }
}

impl<P, S, C: Clock> NativeOverlayBuilder<P, S, C> {
    /// Set the plugin metadata.
    pub fn with_info(mut self, info: PluginInfo) -> Self {
        self.info = info;
        self
    }

    /// Set where settings are loaded from and saved to. Defaults to an
    /// in-memory store.
    pub fn with_settings_store(mut self, settings: impl SettingsStore + 'static) -> Self {
        self.settings = Box::new(settings);
        self
    }

    /// Drive the tick engine with a custom clock.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> NativeOverlayBuilder<P, S, C2> {
        NativeOverlayBuilder {
            platform: self.platform,
            scene: self.scene,
            info: self.info,
            settings: self.settings,
            clock,
        }
    }

    /// Build the plugin, uninitialized.
    pub fn build<T>(self) -> NativeOverlay<P, T, S, C>
    where
        P: WindowPlatform + Clone,
        T: TargetWindow,
        S: Scene<P::Device>,
    {
        let interval = self.settings.current().update_interval();
        NativeOverlay {
            engine: TickEngine::with_clock(interval, self.clock),
            inner: OverlayState {
                platform: self.platform,
                info: self.info,
                settings: self.settings,
                scene: self.scene,
                target: None,
                window: None,
                state: PluginState::Uninitialized,
            },
        }
    }
}

struct OverlayState<P: WindowPlatform, T, S> {
    platform: P,
    info: PluginInfo,
    settings: Box<dyn SettingsStore>,
    scene: S,
    target: Option<T>,
    window: Option<OverlayWindow<P>>,
    state: PluginState,
}

impl<P: WindowPlatform, T, S> OverlayState<P, T, S> {
    fn invalid(&self, operation: &'static str) -> Error {
        Error::InvalidState { operation, state: self.state.as_str() }
    }
}

// Present one fully transparent frame.
fn clear_surface<D: DrawDevice>(renderer: &mut Renderer<D>) -> Result<()> {
    renderer.begin_scene()?;
    renderer.clear_scene();
    renderer.end_scene()
}

impl<P, T, S> TickHandler for OverlayState<P, T, S>
where
    P: WindowPlatform,
    T: TargetWindow,
    S: Scene<P::Device>,
{
    type Error = Error;

    fn pre_tick(&mut self) -> Result<()> {
        let (Some(target), Some(window)) = (self.target.as_ref(), self.window.as_mut()) else {
            return Ok(());
        };

        window.pump_messages();

        let activated = target.is_activated();
        if !activated && window.is_visible() {
            if let Some(renderer) = window.renderer_mut() {
                clear_surface(renderer)?;
            }
            window.hide()?;
        } else if activated && !window.is_visible() {
            window.show()?;
        }

        match target.bounds() {
            Ok(bounds) => {
                window.follow(bounds)?;
            },
            Err(e) => trace!("Keeping overlay bounds, target unavailable: {e}"),
        }
        Ok(())
    }

    fn tick(&mut self) -> Result<()> {
        let Some(window) = self.window.as_mut() else {
            return Ok(());
        };
        if !window.is_visible() {
            return Ok(());
        }
        let Some(renderer) = window.renderer_mut() else {
            return Ok(());
        };

        renderer.begin_scene()?;
        renderer.clear_scene();
        let rendered = self.scene.render(renderer);
        let presented = renderer.end_scene();
        rendered.and(presented)
    }

    fn post_tick(&mut self) -> Result<()> {
        self.scene.post_tick()
    }
}

/// Overlay plugin drawing a [`Scene`] on a native overlay window.
///
/// See the [module documentation](self).
pub struct NativeOverlay<P, T, S, C = SystemClock>
where
    P: WindowPlatform + Clone,
    T: TargetWindow,
    S: Scene<P::Device>,
    C: Clock,
{
    engine: TickEngine<C>,
    inner: OverlayState<P, T, S>,
}

impl<P, T, S, C> NativeOverlay<P, T, S, C>
where
    P: WindowPlatform + Clone,
    T: TargetWindow,
    S: Scene<P::Device>,
    C: Clock,
{
    /// Current lifecycle state.
    pub fn state(&self) -> PluginState {
        self.inner.state
    }

    /// Plugin metadata.
    pub fn info(&self) -> &PluginInfo {
        &self.inner.info
    }

    /// Current settings.
    pub fn settings(&self) -> &OverlaySettings {
        self.inner.settings.current()
    }

    /// Interval the tick engine currently runs at.
    pub fn tick_interval(&self) -> std::time::Duration {
        self.engine.interval()
    }

    /// The followed window, once initialized.
    pub fn target(&self) -> Option<&T> {
        self.inner.target.as_ref()
    }

    /// The overlay window, between initialization and disposal.
    pub fn window(&self) -> Option<&OverlayWindow<P>> {
        self.inner.window.as_ref()
    }

    /// The overlay window, between initialization and disposal.
    pub fn window_mut(&mut self) -> Option<&mut OverlayWindow<P>> {
        self.inner.window.as_mut()
    }

    /// The overlay's renderer, between initialization and disposal.
    pub fn renderer(&self) -> Option<&Renderer<P::Device>> {
        self.window().and_then(|window| window.renderer())
    }

    /// The overlay's renderer, between initialization and disposal.
    pub fn renderer_mut(&mut self) -> Option<&mut Renderer<P::Device>> {
        self.window_mut().and_then(|window| window.renderer_mut())
    }

    /// The scene.
    pub fn scene(&self) -> &S {
        &self.inner.scene
    }

    /// The scene.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.inner.scene
    }
}

impl<P, T, S, C> OverlayPlugin for NativeOverlay<P, T, S, C>
where
    P: WindowPlatform + Clone,
    T: TargetWindow,
    S: Scene<P::Device>,
    C: Clock,
{
    type Target = T;

    fn initialize(&mut self, target: T) -> Result<()> {
        let inner = &mut self.inner;
        if inner.state != PluginState::Uninitialized {
            return Err(inner.invalid("initialize"));
        }

        let settings = inner.settings.current_mut();
        if settings.update_rate_millis == 0 {
            settings.update_rate_millis = crate::config::DEFAULT_UPDATE_RATE_MILLIS;
        }
        inner.info.write_into(settings);
        inner.settings.save()?;
        inner.settings.load()?;

        let settings = inner.settings.current();
        let mut window =
            OverlayWindow::attached(inner.platform.clone(), target.handle(), settings.limit_fps)?;
        if let Some(renderer) = window.renderer_mut() {
            inner.scene.initialize(renderer)?;
        }

        self.engine.set_interval(settings.update_interval());
        inner.target = Some(target);
        inner.window = Some(window);
        inner.state = PluginState::Initialized;

        info!(
            "Initialized overlay {:?} on {:?} at {:?} per tick",
            inner.info.identifier,
            inner.target.as_ref().map(|t| t.handle()),
            self.engine.interval()
        );
        Ok(())
    }

    fn enable(&mut self) -> Result<()> {
        match self.inner.state {
            PluginState::Enabled => return Ok(()),
            PluginState::Initialized | PluginState::Disabled => {},
            PluginState::Uninitialized | PluginState::Disposed => {
                return Err(self.inner.invalid("enable"));
            },
        }

        self.engine.set_interval(self.inner.settings.current().update_interval());
        self.engine.set_ticking(true);
        self.inner.state = PluginState::Enabled;
        info!("Enabled overlay {:?}", self.inner.info.identifier);
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        match self.inner.state {
            PluginState::Enabled => {},
            PluginState::Initialized | PluginState::Disabled => return Ok(()),
            PluginState::Uninitialized | PluginState::Disposed => {
                return Err(self.inner.invalid("disable"));
            },
        }

        self.engine.set_ticking(false);
        self.inner.state = PluginState::Disabled;
        info!("Disabled overlay {:?}", self.inner.info.identifier);
        Ok(())
    }

    fn update(&mut self) -> Result<bool> {
        if self.inner.state == PluginState::Disposed {
            return Ok(false);
        }
        self.engine.pulse(&mut self.inner)
    }

    fn dispose(&mut self) -> Result<()> {
        if self.inner.state == PluginState::Disposed {
            return Ok(());
        }
        if self.inner.state == PluginState::Enabled {
            self.disable()?;
        }

        let disposed = match self.inner.window.take() {
            Some(mut window) => window.dispose(),
            None => Ok(()),
        };
        self.engine.stop();
        self.inner.target = None;
        self.inner.state = PluginState::Disposed;

        debug!("Disposed overlay {:?}", self.inner.info.identifier);
        disposed
    }

    fn is_enabled(&self) -> bool {
        self.engine.is_ticking()
    }
}

impl<P, T, S, C> Drop for NativeOverlay<P, T, S, C>
where
    P: WindowPlatform + Clone,
    T: TargetWindow,
    S: Scene<P::Device>,
    C: Clock,
{
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            error!("Couldn't dispose overlay {:?}: {e:?}", self.inner.info.identifier);
        }
    }
}
