mod harness;

use std::time::Duration;

use harness::{demo_overlay, setup_tracing, DemoScene, TARGET_BOUNDS};
use hudlayer::config::{JsonSettingsStore, OverlaySettings};
use hudlayer::platform::headless::{DrawCommand, HeadlessPlatform, HeadlessTarget, NativeCall};
use hudlayer::platform::TargetWindow;
use hudlayer::plugin::{NativeOverlay, NativeOverlayBuilder, OverlayPlugin, PluginInfo, PluginState};
use hudlayer::timer::ManualClock;
use hudlayer::{Bounds, Color};

const RATE: Duration = Duration::from_millis(16);

#[test]
fn test_target_move_syncs_once_and_renders_once() {
    setup_tracing();

    let platform = HeadlessPlatform::new();
    let clock = ManualClock::new();
    let target = platform.spawn_target(TARGET_BOUNDS);
    let mut overlay = demo_overlay(&platform, &clock, 16);

    overlay.initialize(target).unwrap();
    overlay.enable().unwrap();
    assert_eq!(overlay.window().unwrap().bounds(), TARGET_BOUNDS);
    platform.clear_log();

    let moved = Bounds::new(120, 100, 800, 600);
    overlay.target().unwrap().set_bounds(moved);
    assert!(overlay.update().unwrap());

    let handle = overlay.window().unwrap().handle();
    let syncs: Vec<_> =
        platform.calls().into_iter().filter(|c| matches!(c, NativeCall::SetBounds(..))).collect();
    assert_eq!(syncs, [NativeCall::SetBounds(handle, moved)]);
    assert_eq!(platform.frames_presented(), 1);
    assert_eq!(overlay.scene().frames, 1);
    assert_eq!(overlay.window().unwrap().bounds(), moved);
}

#[test]
fn test_disabled_overlay_never_ticks() {
    setup_tracing();

    let platform = HeadlessPlatform::new();
    let clock = ManualClock::new();
    let mut overlay = demo_overlay(&platform, &clock, 16);
    overlay.initialize(platform.spawn_target(TARGET_BOUNDS)).unwrap();
    overlay.enable().unwrap();
    assert!(overlay.update().unwrap());

    overlay.disable().unwrap();
    assert_eq!(overlay.state(), PluginState::Disabled);
    platform.clear_log();

    for _ in 0..100 {
        clock.advance(RATE);
        assert!(!overlay.update().unwrap());
    }
    assert_eq!(overlay.scene().frames, 1);
    assert_eq!(overlay.scene().post_ticks, 1);
    assert!(platform.commands().is_empty());

    // No backlog once enabled again.
    overlay.enable().unwrap();
    assert!(overlay.update().unwrap());
    assert!(!overlay.update().unwrap());
    assert_eq!(overlay.scene().frames, 2);
}

#[test]
fn test_rate_is_capped() {
    setup_tracing();

    let platform = HeadlessPlatform::new();
    let clock = ManualClock::new();
    let mut overlay = demo_overlay(&platform, &clock, 16);
    overlay.initialize(platform.spawn_target(TARGET_BOUNDS)).unwrap();
    overlay.enable().unwrap();

    for _ in 0..160 {
        overlay.update().unwrap();
        clock.advance(Duration::from_millis(1));
    }
    assert_eq!(overlay.scene().frames, 10);
    assert_eq!(platform.frames_presented(), 10);
}

#[test]
fn test_buffered_text_is_cached_once() {
    setup_tracing();

    let platform = HeadlessPlatform::new();
    let clock = ManualClock::new();
    let mut overlay = demo_overlay(&platform, &clock, 16);
    overlay.initialize(platform.spawn_target(TARGET_BOUNDS)).unwrap();
    overlay.enable().unwrap();

    for _ in 0..3 {
        overlay.update().unwrap();
        clock.advance(RATE);
    }
    assert_eq!(overlay.scene().frames, 3);

    let renderer = overlay.renderer().unwrap();
    assert_eq!(renderer.text_layout_count(), 2);
    assert_eq!(renderer.cached_layout("DrawBox2D").map(|id| id.index()), Some(0));
    assert_eq!(renderer.cached_layout("DrawBarV").map(|id| id.index()), Some(1));
    assert_eq!(renderer.cached_layout("Frame 1"), None);

    let layouts = platform
        .commands()
        .into_iter()
        .filter(|c| matches!(c, DrawCommand::CreateTextLayout(_)))
        .count();
    // Two cached labels, plus one transient counter per frame.
    assert_eq!(layouts, 2 + 3);
}

#[test]
fn test_pool_clear_restarts_handles() {
    setup_tracing();

    let platform = HeadlessPlatform::new();
    let clock = ManualClock::new();
    let mut overlay = demo_overlay(&platform, &clock, 16);
    overlay.initialize(platform.spawn_target(TARGET_BOUNDS)).unwrap();

    let renderer = overlay.renderer_mut().unwrap();
    assert_eq!(renderer.brush_count(), 2);
    renderer.clear_brushes();
    assert_eq!(renderer.brush_count(), 0);
    assert_eq!(renderer.buffer_brush_size(), 2);
    assert_eq!(renderer.create_brush(0xff00ff00).unwrap().index(), 0);

    renderer.clear_fonts();
    assert_eq!(renderer.font_count(), 0);
    assert_eq!(renderer.buffer_font_size(), 1);
}

#[test]
fn test_focus_loss_clears_and_hides() {
    setup_tracing();

    let platform = HeadlessPlatform::new();
    let clock = ManualClock::new();
    let mut overlay = demo_overlay(&platform, &clock, 16);
    overlay.initialize(platform.spawn_target(TARGET_BOUNDS)).unwrap();
    overlay.enable().unwrap();
    overlay.update().unwrap();
    let handle = overlay.window().unwrap().handle();
    platform.clear_log();

    platform.set_foreground(Default::default());
    clock.advance(RATE);
    assert!(overlay.update().unwrap());
    assert!(!overlay.window().unwrap().is_visible());
    assert_eq!(
        platform.commands(),
        [DrawCommand::BeginDraw, DrawCommand::Clear(Color::TRANSPARENT), DrawCommand::EndDraw]
    );
    assert!(platform.calls().contains(&NativeCall::SetVisible(handle, false)));
    assert_eq!(overlay.scene().frames, 1);

    // Still unfocused: nothing is drawn and nothing changes.
    platform.clear_log();
    clock.advance(RATE);
    assert!(overlay.update().unwrap());
    assert!(platform.commands().is_empty());
    assert!(!platform.calls().iter().any(|c| matches!(c, NativeCall::SetVisible(..))));

    overlay.target().unwrap().activate();
    clock.advance(RATE);
    assert!(overlay.update().unwrap());
    assert!(overlay.window().unwrap().is_visible());
    assert!(platform.calls().contains(&NativeCall::SetVisible(handle, true)));
    assert_eq!(overlay.scene().frames, 2);
}

#[test]
fn test_closed_target_hides_overlay_and_keeps_ticking() {
    setup_tracing();

    let platform = HeadlessPlatform::new();
    let clock = ManualClock::new();
    let mut overlay = demo_overlay(&platform, &clock, 16);
    overlay.initialize(platform.spawn_target(TARGET_BOUNDS)).unwrap();
    overlay.enable().unwrap();
    assert!(overlay.update().unwrap());
    assert_eq!(overlay.scene().frames, 1);

    overlay.target().unwrap().close();
    for _ in 0..3 {
        clock.advance(RATE);
        assert!(overlay.update().unwrap());
    }

    let window = overlay.window().unwrap();
    assert!(!window.is_visible());
    assert_eq!(window.bounds(), TARGET_BOUNDS);
    assert_eq!(overlay.scene().frames, 1);
    assert_eq!(overlay.scene().post_ticks, 4);
    assert_eq!(overlay.state(), PluginState::Enabled);
}

#[test]
fn test_resize_applies_at_next_frame() {
    setup_tracing();

    let platform = HeadlessPlatform::new();
    let clock = ManualClock::new();
    let mut overlay = demo_overlay(&platform, &clock, 16);
    overlay.initialize(platform.spawn_target(TARGET_BOUNDS)).unwrap();
    overlay.enable().unwrap();
    overlay.update().unwrap();
    platform.clear_log();

    overlay.target().unwrap().set_bounds(Bounds::new(100, 100, 1024, 768));
    clock.advance(RATE);
    overlay.update().unwrap();

    let commands = platform.commands();
    let resize = commands.iter().position(|c| *c == DrawCommand::Resize(1024, 768)).unwrap();
    let begin = commands.iter().position(|c| *c == DrawCommand::BeginDraw).unwrap();
    assert!(resize < begin);
    assert_eq!(overlay.renderer().unwrap().size(), (1024, 768));
}

#[test]
fn test_drop_releases_device_before_window() {
    setup_tracing();

    let platform = HeadlessPlatform::new();
    let clock = ManualClock::new();
    let target = platform.spawn_target(TARGET_BOUNDS);
    let target_handle = target.handle();
    let mut overlay = demo_overlay(&platform, &clock, 16);
    overlay.initialize(target).unwrap();
    overlay.enable().unwrap();
    let handle = overlay.window().unwrap().handle();
    platform.clear_log();

    drop(overlay);
    assert_eq!(
        platform.calls(),
        [NativeCall::ReleaseDevice(handle), NativeCall::DestroyWindow(handle)]
    );
    assert_eq!(platform.live_resources(), 0);
    // The target is not owned by the overlay.
    assert!(platform.calls().iter().all(|c| *c != NativeCall::DestroyWindow(target_handle)));
    assert_eq!(platform.window_count(), 1);
}

#[test]
fn test_initialize_persists_metadata() {
    setup_tracing();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlay").join("settings.json");
    let platform = HeadlessPlatform::new();

    let mut overlay: NativeOverlay<_, HeadlessTarget, _, _> =
        NativeOverlayBuilder::new(platform.clone(), DemoScene::default())
            .with_info(PluginInfo::new("demo").with_name("Demo"))
            .with_settings_store(JsonSettingsStore::new(&path).with_backup_on_save(false))
            .with_clock(ManualClock::new())
            .build();
    overlay.initialize(platform.spawn_target(TARGET_BOUNDS)).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    let saved: OverlaySettings = serde_json::from_str(&json).unwrap();
    assert_eq!(saved.identifier, "demo");
    assert_eq!(saved.name, "Demo");
    assert_eq!(saved.update_rate_millis, 16);
    assert_eq!(overlay.settings(), &saved);
}
