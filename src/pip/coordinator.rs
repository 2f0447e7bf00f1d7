//! Floating presentation lifecycle coordinator
//!
//! Drives the floating handle through Idle → Prepared → Active and back,
//! moves the presentation surface in and out of the floating system and
//! translates floating callbacks into playback session commands.

use crate::events::{EventSender, PlayerMessage};
use crate::pip::{
    DeviceSession, FloatingPresentation, PipCallback, PipDelegate, PipLifecycleState, PipOption, SharedPipConfig,
};
use crate::player::{MediaRefresh, PlaybackEngine, PlaybackMirror, PlaybackSession, SeekCompletion};
use crate::surface::{ControlOverlay, HostId, PresentationSurface, ReparentTarget, SurfaceId};
use crate::utils::error::{IntoPipError, PipSyncError, Result};
use log::{debug, error, info, warn};
use std::sync::{Arc, Weak};

/// Callback target handed to the floating handle.
///
/// Everything except the time query is queued for the main loop, so a
/// callback never re-enters the coordinator while it is mid-operation.
/// Queued callbacks carry the id of the floating session the link was
/// created for.
pub struct DelegateLink {
    events: EventSender,
    engine: Weak<dyn PlaybackEngine>,
    session: u64,
}

impl DelegateLink {
    pub fn new(events: EventSender, engine: Weak<dyn PlaybackEngine>, session: u64) -> Self {
        Self { events, engine, session }
    }
}

impl PipDelegate for DelegateLink {
    fn current_time(&self) -> f64 {
        self.engine.upgrade().map(|e| e.current_time()).unwrap_or(0.0)
    }

    fn seek_requested(&self, time: f64, completion: Option<SeekCompletion>) {
        self.events.floating(self.session, PipCallback::SeekRequested { time, completion });
    }

    fn play_pause_toggled(&self, playing: bool) {
        self.events.floating(self.session, PipCallback::PlayPauseToggled(playing));
    }

    fn will_start(&self) {
        self.events.floating(self.session, PipCallback::WillStart);
    }

    fn did_start(&self) {
        self.events.floating(self.session, PipCallback::DidStart);
    }

    fn failed_to_start(&self, error: String) {
        self.events.floating(self.session, PipCallback::FailedToStart(error));
    }

    fn did_stop(&self, is_restore: bool) {
        self.events.floating(self.session, PipCallback::DidStop { is_restore });
    }
}

/// Mirrors session play state to the floating handle and the overlay
pub struct FloatingMirror<'a> {
    floating: Option<&'a dyn FloatingPresentation>,
    overlay: &'a mut ControlOverlay,
}

impl<'a> FloatingMirror<'a> {
    pub fn new(floating: Option<&'a dyn FloatingPresentation>, overlay: &'a mut ControlOverlay) -> Self {
        Self { floating, overlay }
    }
}

impl PlaybackMirror for FloatingMirror<'_> {
    fn playback_changed(&mut self, playing: bool, rate: f64) {
        if let Some(floating) = self.floating {
            floating.set_rate(rate);
        }
        self.overlay.set_paused(!playing);
    }

    fn speed_changed(&mut self, speed: f64) {
        if let Some(floating) = self.floating {
            floating.set_speed(speed);
        }
    }

    fn seek_to_start(&mut self) {
        if let Some(floating) = self.floating {
            floating.seek(0.0);
        }
    }
}

/// Floating presentation lifecycle state machine
pub struct PipCoordinator {
    floating: Arc<dyn FloatingPresentation>,
    device: Arc<dyn DeviceSession>,
    config: SharedPipConfig,
    engine: Weak<dyn PlaybackEngine>,
    link: Option<Arc<dyn PipDelegate>>,
    events: EventSender,

    session: u64,
    state: PipLifecycleState,
    hidden: bool,
    configured: bool,
    prepared_surface: Option<SurfaceId>,
    restore_host: Option<HostId>,
    last_error: Option<String>,
}

impl PipCoordinator {
    pub fn new(
        floating: Arc<dyn FloatingPresentation>,
        device: Arc<dyn DeviceSession>,
        config: SharedPipConfig,
        engine: Weak<dyn PlaybackEngine>,
        events: EventSender,
    ) -> Self {
        Self {
            floating,
            device,
            config,
            engine,
            link: None,
            events,
            session: 0,
            state: PipLifecycleState::Idle,
            hidden: false,
            configured: false,
            prepared_surface: None,
            restore_host: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> PipLifecycleState {
        self.state
    }

    /// Id of the most recently prepared floating session
    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether the floating handle has received a full configuration
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Whether a floating session is prepared or running
    pub fn is_live(&self) -> bool {
        self.state != PipLifecycleState::Idle
    }

    pub fn prepared_surface(&self) -> Option<SurfaceId> {
        self.prepared_surface
    }

    pub fn restore_host(&self) -> Option<HostId> {
        self.restore_host
    }

    /// Error reported by the most recent failed start
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn config(&self) -> &SharedPipConfig {
        &self.config
    }

    /// Mirror targets for session operations
    pub fn mirror<'a>(&'a self, overlay: &'a mut ControlOverlay) -> FloatingMirror<'a> {
        let floating = if self.configured {
            Some(self.floating.as_ref())
        } else {
            None
        };
        FloatingMirror::new(floating, overlay)
    }

    /// Configure the floating handle for `surface` and register it with the system
    pub fn prepare(&mut self, session: &PlaybackSession, surface: &PresentationSurface) -> Result<()> {
        if !surface.is_realized() {
            return Err(PipSyncError::surface_error(
                "Presentation surface has not been embedded yet",
            ));
        }

        if self.state != PipLifecycleState::Idle && self.prepared_surface == Some(surface.id()) {
            debug!("Floating handle already prepared for {:?}", surface.id());
            return Ok(());
        }

        let live = session.loop_enabled();
        let floating = self.floating.as_ref();

        floating.set_content_surface(surface.id());
        self.restore_host = surface.parent().or(surface.last_host());
        floating.set_source_host(self.restore_host);

        floating.set_duration(if live { 0.0 } else { session.duration() });
        floating.set_enable_seek(!live);
        floating.set_video_size(session.presentation_size());
        floating.set_rate(if session.is_paused() { 0.0 } else { session.requested_speed() });
        floating.set_speed(session.requested_speed());

        let frame = surface.frame();
        floating.set_restore_areas(frame, frame);

        let config = *self.config.read();
        for option in config.options() {
            floating.set_option(option);
        }
        floating.set_stalled(session.is_stalled());

        self.session += 1;
        let link: Arc<dyn PipDelegate> =
            Arc::new(DelegateLink::new(self.events.clone(), self.engine.clone(), self.session));
        floating.set_delegate(Arc::downgrade(&link));
        self.link = Some(link);
        floating.prepare_presentation();

        self.prepared_surface = Some(surface.id());
        self.configured = true;
        self.state = PipLifecycleState::Prepared;

        info!("Floating session {} prepared for {:?}", self.session, surface.id());
        Ok(())
    }

    /// Begin the floating presentation, preparing first when idle
    pub fn start(&mut self, session: &PlaybackSession, surface: &PresentationSurface) -> Result<()> {
        if self.state == PipLifecycleState::Idle {
            self.prepare(session, surface)?;
        }

        if self.state == PipLifecycleState::Active {
            debug!("Floating presentation already active");
            return Ok(());
        }

        self.last_error = None;
        self.state = PipLifecycleState::Active;
        self.floating.start();

        info!("Floating presentation start requested");
        Ok(())
    }

    /// End the floating presentation without choosing a restore target
    pub fn stop(&mut self) {
        if self.state == PipLifecycleState::Idle {
            debug!("Stop ignored, no floating session");
            return;
        }

        self.floating.stop();
        self.state = PipLifecycleState::Idle;
        self.prepared_surface = None;
        self.hidden = false;

        info!("Floating presentation stopped");
    }

    /// End the floating presentation and return the surface to its host
    pub fn stop_and_restore(&mut self) {
        if self.state != PipLifecycleState::Active {
            debug!("Stop and restore ignored in {:?}", self.state);
            return;
        }

        info!("Floating presentation stop with restore requested");
        self.floating.stop_and_restore();
    }

    /// Pause the floating presentation and give up audio exclusivity
    pub fn hide(&mut self) {
        if self.state != PipLifecycleState::Active || self.hidden {
            debug!("Hide ignored in {:?}", self.state);
            return;
        }

        self.floating.hide_and_pause();
        self.device.set_audio_exclusive(false);
        self.hidden = true;

        info!("Floating presentation hidden");
    }

    /// Reactivate a hidden floating presentation
    pub fn resume(&mut self) {
        if !self.hidden {
            debug!("Resume ignored, floating presentation not hidden");
            return;
        }

        self.device.set_audio_exclusive(true);
        self.floating.resume();
        self.hidden = false;

        info!("Floating presentation resumed");
    }

    /// Store a configuration field and push it when a session is live
    pub fn set_option(&mut self, option: PipOption) {
        self.config.write().apply(option);

        if self.is_live() {
            debug!("Pushing {:?} to floating handle", option);
            self.floating.set_option(option);
        }
    }

    pub fn push_stalled(&self, stalled: bool) {
        if self.is_live() {
            self.floating.set_stalled(stalled);
        }
    }

    /// Push live/loop presentation mode and the matching duration
    pub fn push_live_mode(&self, live: bool, duration: f64) {
        if !self.configured {
            return;
        }
        self.floating.set_duration(if live { 0.0 } else { duration });
        self.floating.set_enable_seek(!live);
    }

    /// Push a switched-in item's duration and size, then rebuild the floating
    /// timeline. Returns false when no floating handle is configured.
    pub fn refresh_media(&self, refresh: MediaRefresh, live: bool) -> bool {
        if !self.configured {
            debug!("Media refresh skipped, floating handle not configured");
            return false;
        }

        self.floating.set_video_size(refresh.presentation_size);
        self.push_live_mode(live, refresh.duration);

        let events = self.events.clone();
        self.floating.reset_video(Box::new(move |result| {
            events.post(PlayerMessage::VideoReset(result));
        }));
        true
    }

    /// Floating timeline reset finished
    pub fn on_video_reset(
        &self,
        result: std::result::Result<(), String>,
        session: &mut PlaybackSession,
        overlay: &mut ControlOverlay,
    ) -> Result<()> {
        if let Err(e) = result.floating_err("Resetting floating timeline") {
            warn!("{}", e);
            return Ok(());
        }

        debug!("Floating timeline reset, resynchronizing playback");
        let mut mirror = self.mirror(overlay);
        session.pause(&mut mirror);
        session.play(&mut mirror)
    }

    /// Handle a queued callback from floating session `from`. Callbacks from
    /// a session that has since been replaced by a new prepare are dropped.
    pub fn handle_callback(
        &mut self,
        from: u64,
        callback: PipCallback,
        session: &mut PlaybackSession,
        surface: &mut PresentationSurface,
        overlay: &mut ControlOverlay,
    ) -> Result<()> {
        if from != self.session {
            debug!(
                "Ignoring {:?} from floating session {} (current {})",
                callback, from, self.session
            );
            return Ok(());
        }

        match callback {
            PipCallback::SeekRequested { time, completion } => {
                debug!("Floating seek request to {:.3}s", time);
                session.seek(time, completion, &mut self.mirror(overlay))?;
            }
            PipCallback::PlayPauseToggled(playing) => {
                let mut mirror = self.mirror(overlay);
                if playing {
                    session.play(&mut mirror)?;
                } else {
                    session.pause(&mut mirror);
                }
            }
            PipCallback::WillStart => {
                // the system may start a prepared presentation on its own
                self.state = PipLifecycleState::Active;
                surface.set_floating_rendered(true);
                surface.set_pip_compositing(true);
                overlay.set_floating_rendered(true);
                surface.reparent(ReparentTarget::Detached)?;
                debug!("Floating presentation will start");
            }
            PipCallback::DidStart => {
                info!("Floating presentation started");
            }
            PipCallback::FailedToStart(err) => {
                error!("Floating presentation failed to start: {}", err);
                self.last_error = Some(err);
                self.state = PipLifecycleState::Prepared;
            }
            PipCallback::DidStop { is_restore } => {
                self.on_did_stop(is_restore, surface, overlay)?;
            }
        }
        Ok(())
    }

    fn on_did_stop(
        &mut self,
        is_restore: bool,
        surface: &mut PresentationSurface,
        overlay: &mut ControlOverlay,
    ) -> Result<()> {
        if is_restore {
            self.state = PipLifecycleState::Restoring;
            self.restore(surface)?;
        } else {
            self.return_to_host(surface)?;
        }

        surface.set_floating_rendered(false);
        overlay.set_floating_rendered(false);
        self.device.end_remote_control_events();

        self.state = PipLifecycleState::Idle;
        self.prepared_surface = None;
        self.hidden = false;

        info!("Floating presentation stopped (restore: {})", is_restore);
        Ok(())
    }

    fn restore(&mut self, surface: &mut PresentationSurface) -> Result<()> {
        let host = self.return_to_host(surface)?;
        surface.force_relayout()?;

        debug!("Surface restored into {:?}", host);
        Ok(())
    }

    /// Put the surface back into the host it was prepared from
    fn return_to_host(&self, surface: &mut PresentationSurface) -> Result<HostId> {
        let host = self
            .restore_host
            .or(surface.last_host())
            .ok_or_else(|| PipSyncError::surface_error("No host region to restore into"))?;

        surface.reparent(ReparentTarget::Host(host))?;
        surface.set_pip_compositing(false);
        Ok(host)
    }
}

impl std::fmt::Debug for PipCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipCoordinator")
            .field("session", &self.session)
            .field("state", &self.state)
            .field("hidden", &self.hidden)
            .field("configured", &self.configured)
            .field("prepared_surface", &self.prepared_surface)
            .field("restore_host", &self.restore_host)
            .finish()
    }
}
