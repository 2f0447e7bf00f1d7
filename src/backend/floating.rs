//! Simulated floating presentation system
//!
//! Records every value pushed by the coordinator and answers lifecycle
//! requests by calling back through the registered delegate, the way the
//! system service would. The `user_*` helpers play the part of the person
//! interacting with the floating window.

use crate::pip::{FloatingPresentation, PipConfiguration, PipDelegate, PipOption, ResetCompletion};
use crate::player::SeekCompletion;
use crate::surface::{HostId, Rect, Size, SurfaceId};
use log::{debug, info};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};

/// One call received from the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum FloatingCall {
    SetContentSurface(SurfaceId),
    SetSourceHost(Option<HostId>),
    SetDuration(f64),
    SetVideoSize(Size),
    SetRate(f64),
    SetSpeed(f64),
    SetEnableSeek(bool),
    SetStalled(bool),
    SetRestoreAreas(Rect, Rect),
    SetOption(PipOption),
    PreparePresentation,
    Start,
    Stop,
    StopAndRestore,
    HideAndPause,
    Resume,
    Seek(f64),
    ResetVideo,
}

/// Values currently held by the floating handle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatingSnapshot {
    pub content_surface: Option<SurfaceId>,
    pub source_host: Option<HostId>,
    pub duration: f64,
    pub video_size: Size,
    pub rate: f64,
    pub speed: f64,
    pub enable_seek: bool,
    pub stalled: bool,
    pub restore_areas: Option<(Rect, Rect)>,
    pub config: PipConfiguration,
    pub prepared: bool,
    pub active: bool,
    pub hidden: bool,
    pub prepare_count: usize,
    pub delegate_registrations: usize,
    pub reset_count: usize,
}

impl Default for FloatingSnapshot {
    fn default() -> Self {
        Self {
            content_surface: None,
            source_host: None,
            duration: 0.0,
            video_size: Size::ZERO,
            rate: 0.0,
            speed: 1.0,
            enable_seek: true,
            stalled: false,
            restore_areas: None,
            config: PipConfiguration::default(),
            prepared: false,
            active: false,
            hidden: false,
            prepare_count: 0,
            delegate_registrations: 0,
            reset_count: 0,
        }
    }
}

#[derive(Default)]
struct FloatingInner {
    snapshot: FloatingSnapshot,
    calls: Vec<FloatingCall>,
    delegate: Option<Weak<dyn PipDelegate>>,
    fail_next_start: Option<String>,
}

/// Floating presentation handle kept in memory
#[derive(Default)]
pub struct SimulatedFloating {
    inner: Mutex<FloatingInner>,
}

impl SimulatedFloating {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> FloatingSnapshot {
        self.inner.lock().snapshot.clone()
    }

    pub fn calls(&self) -> Vec<FloatingCall> {
        self.inner.lock().calls.clone()
    }

    /// Reject the next start request with `error`
    pub fn fail_next_start(&self, error: &str) {
        self.inner.lock().fail_next_start = Some(error.to_string());
    }

    /// Time reported by the delegate, if one is still alive
    pub fn query_time(&self) -> Option<f64> {
        self.delegate().map(|d| d.current_time())
    }

    /// The restore button on the floating window
    pub fn user_requested_restore(&self) {
        self.finish(true);
    }

    /// The close button on the floating window
    pub fn user_closed(&self) {
        self.finish(false);
    }

    pub fn user_toggled(&self, playing: bool) {
        if let Some(delegate) = self.delegate() {
            delegate.play_pause_toggled(playing);
        }
    }

    pub fn user_seek(&self, time: f64, completion: Option<SeekCompletion>) {
        if let Some(delegate) = self.delegate() {
            delegate.seek_requested(time, completion);
        }
    }

    /// App moved to the background. Starts a prepared presentation when
    /// auto-start is configured.
    pub fn enter_background(&self) -> bool {
        let should_start = {
            let inner = self.inner.lock();
            let s = &inner.snapshot;
            s.config.auto_start_on_background && s.prepared && !s.active
        };

        if should_start {
            info!("Auto-starting floating presentation on background");
            self.start();
        }
        should_start
    }

    fn delegate(&self) -> Option<Arc<dyn PipDelegate>> {
        let weak = self.inner.lock().delegate.clone();
        weak.and_then(|w| w.upgrade())
    }

    fn record<F>(&self, call: FloatingCall, update: F)
    where
        F: FnOnce(&mut FloatingSnapshot),
    {
        let mut inner = self.inner.lock();
        update(&mut inner.snapshot);
        inner.calls.push(call);
    }

    fn finish(&self, is_restore: bool) {
        let was_active = {
            let mut inner = self.inner.lock();
            let was_active = inner.snapshot.active;
            inner.snapshot.active = false;
            inner.snapshot.hidden = false;
            inner.snapshot.prepared = false;
            was_active
        };

        if !was_active {
            debug!("Floating presentation not active, nothing to stop");
            return;
        }

        if let Some(delegate) = self.delegate() {
            delegate.did_stop(is_restore);
        }
    }
}

impl FloatingPresentation for SimulatedFloating {
    fn set_delegate(&self, delegate: Weak<dyn PipDelegate>) {
        let mut inner = self.inner.lock();
        inner.delegate = Some(delegate);
        inner.snapshot.delegate_registrations += 1;
    }

    fn set_content_surface(&self, surface: SurfaceId) {
        self.record(FloatingCall::SetContentSurface(surface), |s| s.content_surface = Some(surface));
    }

    fn set_source_host(&self, host: Option<HostId>) {
        self.record(FloatingCall::SetSourceHost(host), |s| s.source_host = host);
    }

    fn set_duration(&self, duration: f64) {
        self.record(FloatingCall::SetDuration(duration), |s| s.duration = duration);
    }

    fn set_video_size(&self, size: Size) {
        self.record(FloatingCall::SetVideoSize(size), |s| s.video_size = size);
    }

    fn set_rate(&self, rate: f64) {
        self.record(FloatingCall::SetRate(rate), |s| s.rate = rate);
    }

    fn set_speed(&self, speed: f64) {
        self.record(FloatingCall::SetSpeed(speed), |s| s.speed = speed);
    }

    fn set_enable_seek(&self, enabled: bool) {
        self.record(FloatingCall::SetEnableSeek(enabled), |s| s.enable_seek = enabled);
    }

    fn set_stalled(&self, stalled: bool) {
        self.record(FloatingCall::SetStalled(stalled), |s| s.stalled = stalled);
    }

    fn set_restore_areas(&self, background: Rect, foreground: Rect) {
        self.record(FloatingCall::SetRestoreAreas(background, foreground), |s| {
            s.restore_areas = Some((background, foreground))
        });
    }

    fn set_option(&self, option: PipOption) {
        self.record(FloatingCall::SetOption(option), |s| s.config.apply(option));
    }

    fn prepare_presentation(&self) {
        self.record(FloatingCall::PreparePresentation, |s| {
            s.prepared = true;
            s.prepare_count += 1;
        });
    }

    fn start(&self) {
        let failure = {
            let mut inner = self.inner.lock();
            inner.calls.push(FloatingCall::Start);
            let failure = inner.fail_next_start.take();
            if failure.is_none() {
                inner.snapshot.active = true;
            }
            failure
        };

        let delegate = match self.delegate() {
            Some(delegate) => delegate,
            None => {
                debug!("Start requested without a live delegate");
                return;
            }
        };

        match failure {
            Some(error) => delegate.failed_to_start(error),
            None => {
                delegate.will_start();
                delegate.did_start();
            }
        }
    }

    fn stop(&self) {
        self.inner.lock().calls.push(FloatingCall::Stop);
        self.finish(false);
    }

    fn stop_and_restore(&self) {
        self.inner.lock().calls.push(FloatingCall::StopAndRestore);
        self.finish(true);
    }

    fn hide_and_pause(&self) {
        self.record(FloatingCall::HideAndPause, |s| {
            s.hidden = true;
            s.rate = 0.0;
        });
    }

    fn resume(&self) {
        self.record(FloatingCall::Resume, |s| s.hidden = false);
    }

    fn seek(&self, time: f64) {
        self.record(FloatingCall::Seek(time), |_| {});
    }

    fn reset_video(&self, completion: ResetCompletion) {
        self.record(FloatingCall::ResetVideo, |s| s.reset_count += 1);
        completion(Ok(()));
    }
}

impl std::fmt::Debug for SimulatedFloating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedFloating")
            .field("snapshot", &self.inner.lock().snapshot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDelegate {
        starts: AtomicUsize,
        failures: AtomicUsize,
        restores: AtomicUsize,
    }

    impl PipDelegate for CountingDelegate {
        fn current_time(&self) -> f64 {
            4.5
        }
        fn seek_requested(&self, _time: f64, _completion: Option<SeekCompletion>) {}
        fn play_pause_toggled(&self, _playing: bool) {}
        fn will_start(&self) {}
        fn did_start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn failed_to_start(&self, _error: String) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        fn did_stop(&self, is_restore: bool) {
            if is_restore {
                self.restores.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn registered() -> (SimulatedFloating, Arc<CountingDelegate>) {
        let floating = SimulatedFloating::new();
        let delegate = Arc::new(CountingDelegate::default());
        let as_dyn: Arc<dyn PipDelegate> = delegate.clone();
        floating.set_delegate(Arc::downgrade(&as_dyn));
        (floating, delegate)
    }

    #[test]
    fn test_delegate_is_not_kept_alive() {
        let (floating, delegate) = registered();
        assert_eq!(floating.query_time(), Some(4.5));

        drop(delegate);
        assert_eq!(floating.query_time(), None);
    }

    #[test]
    fn test_start_failure_is_reported_once() {
        let (floating, delegate) = registered();
        floating.prepare_presentation();
        floating.fail_next_start("busy");

        floating.start();
        floating.start();
        assert_eq!(delegate.failures.load(Ordering::SeqCst), 1);
        assert_eq!(delegate.starts.load(Ordering::SeqCst), 1);
        assert!(floating.snapshot().active);
    }

    #[test]
    fn test_restore_only_when_active() {
        let (floating, delegate) = registered();
        floating.user_requested_restore();
        assert_eq!(delegate.restores.load(Ordering::SeqCst), 0);

        floating.prepare_presentation();
        floating.start();
        floating.user_requested_restore();
        assert_eq!(delegate.restores.load(Ordering::SeqCst), 1);
        assert!(!floating.snapshot().active);
    }

    #[test]
    fn test_background_auto_start_follows_config() {
        let (floating, delegate) = registered();
        floating.prepare_presentation();
        floating.set_option(PipOption::AutoStartOnBackground(false));
        assert!(!floating.enter_background());

        floating.set_option(PipOption::AutoStartOnBackground(true));
        assert!(floating.enter_background());
        assert_eq!(delegate.starts.load(Ordering::SeqCst), 1);
    }
}
