//! Integration tests for the floating presentation lifecycle
//!
//! These tests verify preparation, start, stop, restore, hide/resume and
//! configuration pushes against the simulated floating system.

use anyhow::Result;
use pipsync::backend::FloatingCall;
use pipsync::pip::{PipLifecycleState, PipOption};
use pipsync::surface::SurfaceOwnership;
use pipsync_integration_tests::TestFixture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[test]
fn test_prepare_twice_registers_once() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4", "b.mp4"])?;

    fx.controller.prepare()?;
    fx.controller.prepare()?;

    let snapshot = fx.floating.snapshot();
    assert_eq!(snapshot.prepare_count, 1);
    assert_eq!(snapshot.delegate_registrations, 1);
    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Prepared);

    Ok(())
}

#[test]
fn test_start_detaches_surface_and_hides_overlay() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    fx.start_floating()?;

    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Active);
    assert_eq!(fx.controller.surface().ownership(), SurfaceOwnership::Detached);
    assert_eq!(fx.controller.surface().parent_count(), 0);
    assert!(fx.controller.surface().is_floating_rendered());
    assert!(!fx.controller.tap_overlay(Instant::now()));

    Ok(())
}

#[test]
fn test_restore_returns_surface_to_original_host() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    let host = fx.controller.embedded_host();
    fx.start_floating()?;

    fx.floating.user_requested_restore();
    fx.pump();

    let surface = fx.controller.surface();
    assert_eq!(surface.ownership(), SurfaceOwnership::EmbeddedIn(host));
    assert_eq!(surface.parent_count(), 1);
    assert!(!surface.pip_compositing());
    assert!(!surface.is_floating_rendered());
    assert!(surface.layout_passes() >= 3);
    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Idle);
    assert_eq!(fx.device.remote_control_releases(), 1);
    assert!(fx.controller.tap_overlay(Instant::now()));

    Ok(())
}

#[test]
fn test_stop_and_restore_uses_restore_path() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    let host = fx.controller.embedded_host();
    fx.start_floating()?;

    fx.controller.stop_and_restore();
    fx.pump();

    assert_eq!(fx.controller.surface().parent(), Some(host));
    assert!(!fx.controller.surface().pip_compositing());
    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Idle);

    Ok(())
}

#[test]
fn test_explicit_stop_re_embeds_without_relayout() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    let host = fx.controller.embedded_host();
    fx.start_floating()?;
    let passes = fx.controller.surface().layout_passes();

    fx.controller.stop();
    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Idle);
    fx.pump();

    let surface = fx.controller.surface();
    assert_eq!(surface.ownership(), SurfaceOwnership::EmbeddedIn(host));
    assert_eq!(surface.parent_count(), 1);
    assert_eq!(surface.layout_passes(), passes + 1);
    assert!(!surface.pip_compositing());
    assert_eq!(fx.device.remote_control_releases(), 1);

    // a fresh start prepares again
    fx.controller.start()?;
    fx.pump();
    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Active);
    assert_eq!(fx.floating.snapshot().prepare_count, 2);

    Ok(())
}

#[test]
fn test_closing_floating_window_returns_surface_to_host() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    let host = fx.controller.embedded_host();
    fx.start_floating()?;

    fx.floating.user_closed();
    fx.pump();

    let surface = fx.controller.surface();
    assert_eq!(surface.parent(), Some(host));
    assert_eq!(surface.host(host).map(|h| h.children().len()), Some(1));
    assert!(!surface.is_floating_rendered());
    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Idle);
    assert!(fx.controller.tap_overlay(Instant::now()));

    Ok(())
}

#[test]
fn test_restart_before_pump_ignores_previous_stop() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    fx.start_floating()?;

    fx.controller.stop();
    fx.controller.start()?;
    fx.pump();

    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Active);
    assert!(fx.controller.coordinator().prepared_surface().is_some());
    assert_eq!(fx.controller.surface().ownership(), SurfaceOwnership::Detached);
    assert_eq!(fx.device.remote_control_releases(), 0);

    let registrations = fx.floating.snapshot().delegate_registrations;
    fx.controller.prepare()?;
    assert_eq!(fx.floating.snapshot().delegate_registrations, registrations);
    assert_eq!(registrations, 2);

    Ok(())
}

#[test]
fn test_hide_then_resume_stays_active() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    fx.start_floating()?;

    fx.controller.hide();
    assert!(fx.controller.coordinator().is_hidden());
    assert_eq!(fx.device.audio_exclusive(), Some(false));
    assert!(fx.floating.snapshot().hidden);

    fx.controller.resume();
    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Active);
    assert_eq!(fx.device.audio_exclusive(), Some(true));
    assert!(!fx.floating.snapshot().hidden);
    assert_eq!(fx.floating.snapshot().prepare_count, 1);

    Ok(())
}

#[test]
fn test_controls_hidden_pushed_while_active() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    fx.start_floating()?;

    fx.controller.set_controls_hidden(true);

    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Active);
    assert!(fx.controller.pip_config().controls_hidden);
    assert!(fx.floating.snapshot().config.controls_hidden);
    assert_eq!(
        fx.floating.calls().last(),
        Some(&FloatingCall::SetOption(PipOption::ControlsHidden(true)))
    );

    Ok(())
}

#[test]
fn test_config_setters_before_prepare_are_applied_on_prepare() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    fx.controller.set_pause_on_exit(true);
    fx.controller.set_use_low_level_frame_backend(false);
    assert!(fx.floating.calls().is_empty());

    fx.controller.prepare()?;
    let config = fx.floating.snapshot().config;
    assert!(config.pause_on_exit);
    assert!(!config.use_low_level_frame_backend);

    Ok(())
}

#[test]
fn test_failed_start_can_be_retried() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    fx.floating.fail_next_start("presentation refused");
    fx.start_floating()?;

    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Prepared);
    assert_eq!(fx.controller.coordinator().last_error(), Some("presentation refused"));
    assert_eq!(fx.controller.surface().ownership(), SurfaceOwnership::EmbeddedIn(fx.controller.embedded_host()));

    fx.controller.start()?;
    fx.pump();
    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Active);
    assert_eq!(fx.floating.snapshot().prepare_count, 1);

    Ok(())
}

#[test]
fn test_background_auto_start() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    fx.controller.play()?;
    fx.controller.prepare()?;

    assert!(fx.floating.enter_background());
    fx.pump();

    assert_eq!(fx.controller.lifecycle(), PipLifecycleState::Active);
    assert_eq!(fx.controller.surface().ownership(), SurfaceOwnership::Detached);

    Ok(())
}

#[test]
fn test_floating_seek_completion_is_deferred() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    fx.start_floating()?;

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    fx.floating.user_seek(
        6.0,
        Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    );
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    fx.pump();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(fx.controller.state().current_time, 6.0);
    assert_eq!(fx.floating.query_time(), Some(6.0));

    Ok(())
}

#[test]
fn test_floating_toggle_mirrors_to_overlay() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    fx.start_floating()?;

    fx.floating.user_toggled(false);
    fx.pump();
    assert!(fx.controller.session().is_paused());
    assert!(fx.controller.overlay().is_paused());
    assert_eq!(fx.floating.snapshot().rate, 0.0);

    fx.floating.user_toggled(true);
    fx.pump();
    assert_eq!(fx.floating.snapshot().rate, 1.0);

    Ok(())
}

#[test]
fn test_delegate_does_not_outlive_controller() -> Result<()> {
    let mut fx = TestFixture::new(&["a.mp4"])?;
    fx.controller.prepare()?;
    assert!(fx.floating.query_time().is_some());

    let floating = Arc::clone(&fx.floating);
    drop(fx);
    assert_eq!(floating.query_time(), None);

    Ok(())
}
