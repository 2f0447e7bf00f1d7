//! Integration tests for playback through the controller
//!
//! These tests verify:
//! - Playlist switching and wrap-around
//! - Replay, seek and speed semantics
//! - End-of-item handling for loop, auto-advance and plain playback
//! - Configuration loading into a running controller

use anyhow::Result;
use pipsync::backend::{FloatingCall, DEFAULT_DURATION};
use pipsync::player::{Direction, SeekTolerance};
use pipsync::utils::Config;
use pipsync_integration_tests::TestFixture;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;

#[test]
fn test_switch_wraps_through_playlist() -> Result<()> {
    let mut fx = TestFixture::new(&["A", "B", "C"])?;
    fx.controller.play()?;
    assert_eq!(fx.current().as_deref(), Some("A"));

    fx.controller.switch_item(Direction::Forward)?;
    assert_eq!(fx.current().as_deref(), Some("B"));

    fx.controller.switch_item(Direction::Forward)?;
    fx.controller.switch_item(Direction::Forward)?;
    fx.pump();
    assert_eq!(fx.current().as_deref(), Some("A"));
    assert!(!fx.controller.session().is_paused());

    Ok(())
}

#[test]
fn test_forward_then_backward_returns_to_origin() -> Result<()> {
    let items = ["one", "two", "three", "four"];
    let mut fx = TestFixture::new(&items)?;
    fx.controller.play()?;

    for _ in 0..items.len() {
        fx.controller.switch_item(Direction::Forward)?;
        fx.controller.switch_item(Direction::Backward)?;
    }
    fx.pump();
    assert_eq!(fx.current().as_deref(), Some("one"));

    Ok(())
}

#[test]
fn test_replay_at_end_seeks_to_zero_first() -> Result<()> {
    let mut fx = TestFixture::new(&["A"])?;
    fx.start_floating()?;

    fx.play_for(DEFAULT_DURATION + 1.0);
    assert!(fx.controller.session().is_paused());
    assert_eq!(fx.controller.state().current_time, DEFAULT_DURATION);

    fx.controller.play()?;

    assert_eq!(fx.engine.seek_log(), vec![(0.0, SeekTolerance::Exact)]);
    assert_eq!(fx.controller.state().current_time, 0.0);
    assert_eq!(fx.controller.state().rate, 1.0);

    let calls = fx.floating.calls();
    let seek_at = calls.iter().rposition(|c| *c == FloatingCall::Seek(0.0));
    let rate_at = calls.iter().rposition(|c| *c == FloatingCall::SetRate(1.0));
    assert!(seek_at.is_some());
    assert!(seek_at < rate_at);

    Ok(())
}

#[test]
fn test_seek_past_end_starts_playback() -> Result<()> {
    let mut fx = TestFixture::new(&["A"])?;
    fx.controller.play()?;
    fx.controller.pause();

    fx.controller.seek(DEFAULT_DURATION + 3.0, None)?;
    assert!(!fx.controller.session().is_paused());
    assert!(!fx.controller.overlay().is_paused());

    Ok(())
}

#[test]
fn test_non_positive_speeds_are_ignored() -> Result<()> {
    let mut fx = TestFixture::new(&["A"])?;
    fx.controller.play()?;

    for speed in [0.0, -1.0, -0.001, f64::NAN] {
        assert!(!fx.controller.set_speed(speed));
        let state = fx.controller.state();
        assert_eq!(state.rate, 1.0);
        assert_eq!(state.requested_speed, 1.0);
    }

    Ok(())
}

#[test]
fn test_speed_while_paused_applies_on_next_play() -> Result<()> {
    let mut fx = TestFixture::new(&["A"])?;
    fx.start_floating()?;
    fx.controller.pause();

    assert!(fx.controller.set_speed(1.5));
    assert_eq!(fx.controller.state().rate, 0.0);
    assert_eq!(fx.floating.snapshot().speed, 1.5);
    assert_eq!(fx.floating.snapshot().rate, 0.0);

    fx.controller.play()?;
    assert_eq!(fx.controller.state().rate, 1.5);
    assert_eq!(fx.engine.rate(), 1.5);
    assert_eq!(fx.floating.snapshot().rate, 1.5);

    Ok(())
}

#[test]
fn test_end_with_auto_advance_plays_next() -> Result<()> {
    let mut fx = TestFixture::new(&["A", "B"])?;
    fx.controller.set_auto_advance(true);
    fx.controller.play()?;

    fx.play_for(DEFAULT_DURATION + 0.5);
    assert_eq!(fx.current().as_deref(), Some("B"));
    assert!(!fx.controller.session().is_paused());

    Ok(())
}

#[test]
fn test_end_with_loop_restarts_same_item() -> Result<()> {
    let mut fx = TestFixture::new(&["A", "B"])?;
    fx.controller.play()?;
    fx.controller.set_loop_enabled(true);
    assert!(!fx.controller.state().auto_advance);

    fx.play_for(DEFAULT_DURATION + 1.0);
    assert_eq!(fx.current().as_deref(), Some("A"));
    assert!(!fx.controller.session().is_paused());
    assert!(fx.controller.state().current_time < DEFAULT_DURATION);

    Ok(())
}

#[test]
fn test_stale_end_of_item_is_ignored() -> Result<()> {
    let mut fx = TestFixture::new(&["A", "B", "C"])?;
    fx.controller.set_auto_advance(true);
    fx.controller.play()?;
    fx.pump();

    // end of A is queued but not handled before the switch
    fx.engine.advance(DEFAULT_DURATION);
    fx.controller.switch_item(Direction::Forward)?;
    fx.pump();

    assert_eq!(fx.current().as_deref(), Some("B"));
    assert_eq!(fx.engine.load_count(), 2);

    Ok(())
}

#[test]
fn test_switch_while_floating_resets_timeline_once() -> Result<()> {
    let mut fx = TestFixture::new(&["A", "B"])?;
    fx.start_floating()?;

    fx.controller.switch_item(Direction::Forward)?;
    fx.pump();
    fx.pump();

    let snapshot = fx.floating.snapshot();
    assert_eq!(snapshot.reset_count, 1);
    assert_eq!(snapshot.duration, DEFAULT_DURATION);
    assert_eq!(snapshot.rate, 1.0);

    Ok(())
}

#[test]
fn test_overlay_commands_drive_playback() -> Result<()> {
    let mut fx = TestFixture::new(&["A", "B"])?;
    let now = std::time::Instant::now();

    assert!(fx.controller.tap_overlay(now));
    assert!(!fx.controller.tap_overlay(now + Duration::from_secs(1)));
    assert_eq!(fx.controller.overlay().hide_deadline(), Some(now + Duration::from_secs(3)));

    assert!(fx.controller.press_overlay(pipsync::surface::OverlayButton::Next));
    fx.pump();
    assert_eq!(fx.current().as_deref(), Some("B"));

    assert!(fx.controller.tick(now + Duration::from_secs(3)));
    assert!(!fx.controller.press_overlay(pipsync::surface::OverlayButton::PlayPause));

    Ok(())
}

#[test]
#[serial]
fn test_config_file_feeds_controller() -> Result<()> {
    for key in ["PIPSYNC_SPEED", "PIPSYNC_LOOP", "PIPSYNC_AUTO_ADVANCE", "PIPSYNC_LOG_LEVEL"] {
        std::env::remove_var(key);
    }

    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        "[playback]\nplaylist = [\"x.mp4\", \"y.mp4\"]\ndefault_speed = 2.0\n\n[pip]\ncontrols_hidden = true"
    )?;

    let config = Config::load_with(Some(file.path()))?;
    let mut fx = TestFixture::with_config(config)?;
    fx.controller.play()?;
    fx.controller.prepare()?;

    assert_eq!(fx.current().as_deref(), Some("x.mp4"));
    assert_eq!(fx.controller.state().rate, 2.0);
    assert!(fx.floating.snapshot().config.controls_hidden);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_interval_driven_session() -> Result<()> {
    let mut fx = TestFixture::new(&["A", "B"])?;
    fx.controller.set_auto_advance(true);
    fx.controller.play()?;
    fx.controller.start()?;

    let mut interval = tokio::time::interval(Duration::from_millis(100));
    for _ in 0..60 {
        interval.tick().await;
        fx.engine.advance(0.25);
        fx.pump();
    }

    // 15 simulated seconds: A finished, B is playing
    assert_eq!(fx.current().as_deref(), Some("B"));
    assert!(fx.controller.state().current_time > 4.0);
    assert_eq!(fx.floating.snapshot().reset_count, 1);

    Ok(())
}
