//! Player controller implementation for pipsync
//!
//! This module provides the PlayerController that owns the playback
//! session, the presentation surface, the control overlay and the floating
//! presentation coordinator, and exposes the host-facing API. Asynchronous
//! notifications are queued and handled in [`PlayerController::process_events`].

use crate::events::{EventQueue, EventSender, PlayerMessage};
use crate::pip::{
    DeviceSession, FloatingPresentation, PipConfiguration, PipCoordinator, PipLifecycleState, PipOption,
    SharedPipConfig,
};
use crate::player::{
    Direction, EngineEvent, MediaReference, NoMirror, PlaybackEngine, PlaybackSession, PlaybackState, Playlist,
    PlaylistNavigator, PlaylistProvider, SeekCompletion, SeekToken,
};
use crate::surface::{
    ControlOverlay, HostId, OverlayButton, OverlayCommand, PresentationSurface, Rect, ReparentTarget, SurfaceId,
    SurfaceOwnership,
};
use crate::utils::config::Config;
use crate::utils::error::{PipSyncError, Result};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

/// Upper bound on inbox passes in [`PlayerController::run_until_idle`]
const MAX_DRAIN_PASSES: usize = 64;

/// Builder for [`PlayerController`]
pub struct PlayerControllerBuilder {
    engine: Option<Arc<dyn PlaybackEngine>>,
    floating: Option<Arc<dyn FloatingPresentation>>,
    device: Option<Arc<dyn DeviceSession>>,
    playlist: Option<Box<dyn PlaylistProvider>>,
    config: Config,
    queue: Option<EventQueue>,
}

impl PlayerControllerBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            floating: None,
            device: None,
            playlist: None,
            config: Config::default(),
            queue: None,
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn PlaybackEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_floating(mut self, floating: Arc<dyn FloatingPresentation>) -> Self {
        self.floating = Some(floating);
        self
    }

    pub fn with_device(mut self, device: Arc<dyn DeviceSession>) -> Self {
        self.device = Some(device);
        self
    }

    /// Playlist source. Defaults to the configured playlist.
    pub fn with_playlist(mut self, playlist: Box<dyn PlaylistProvider>) -> Self {
        self.playlist = Some(playlist);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Inbox the engine was created with. Collaborators must post to the
    /// same queue the controller drains.
    pub fn with_event_queue(mut self, queue: EventQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn build(self) -> Result<PlayerController> {
        let engine = self
            .engine
            .ok_or_else(|| PipSyncError::InvalidInput("No playback engine supplied".to_string()))?;
        let floating = self
            .floating
            .ok_or_else(|| PipSyncError::InvalidInput("No floating presentation supplied".to_string()))?;
        let device = self
            .device
            .ok_or_else(|| PipSyncError::InvalidInput("No device session supplied".to_string()))?;

        let config = self.config;
        let queue = self.queue.unwrap_or_default();

        let playlist = self
            .playlist
            .unwrap_or_else(|| Box::new(Playlist::new(config.playback.playlist.clone())));
        let item_count = playlist.items().len();
        if item_count == 0 {
            return Err(PipSyncError::InvalidInput("Playlist is empty".to_string()));
        }

        let mut surface = PresentationSurface::new(SurfaceId(1));
        let embedded_host = surface.add_host(Rect::new(
            0.0,
            0.0,
            config.surface.host_width,
            config.surface.host_height,
        ));
        surface.reparent(ReparentTarget::Host(embedded_host))?;

        let mut session = PlaybackSession::new(engine.clone(), PlaylistNavigator::new(playlist), surface.id());
        session.set_speed(config.playback.default_speed, &mut NoMirror);
        session.set_auto_advance(config.playback.auto_advance);
        session.set_loop_enabled(config.playback.loop_enabled, &mut NoMirror);

        let pip_config: SharedPipConfig = Arc::new(RwLock::new(config.pip));
        let coordinator = PipCoordinator::new(
            floating,
            device,
            Arc::clone(&pip_config),
            Arc::downgrade(&engine),
            queue.sender(),
        );

        let mut overlay = ControlOverlay::new(config.playback.custom_controls);
        let sender = queue.sender();
        overlay.set_command_handler(Box::new(move |command| {
            sender.post(PlayerMessage::Overlay(command));
        }));

        info!("Player controller ready with {} playlist items", item_count);

        Ok(PlayerController {
            session,
            surface,
            overlay,
            coordinator,
            queue,
            embedded_host,
            pip_config,
        })
    }
}

impl Default for PlayerControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Host-facing controller
pub struct PlayerController {
    session: PlaybackSession,
    surface: PresentationSurface,
    overlay: ControlOverlay,
    coordinator: PipCoordinator,
    queue: EventQueue,
    embedded_host: HostId,
    pip_config: SharedPipConfig,
}

impl PlayerController {
    pub fn builder() -> PlayerControllerBuilder {
        PlayerControllerBuilder::new()
    }

    // Playback

    /// Start or resume playback. A surface left without an in-app parent
    /// while no floating session is running goes back to the embedded host.
    pub fn play(&mut self) -> Result<()> {
        let embedded = matches!(self.surface.ownership(), SurfaceOwnership::EmbeddedIn(_));
        if !embedded && self.coordinator.state() != PipLifecycleState::Active {
            info!("Re-embedding surface before playback");
            self.surface.reparent(ReparentTarget::Host(self.embedded_host))?;
        }

        self.session.play(&mut self.coordinator.mirror(&mut self.overlay))
    }

    pub fn pause(&mut self) {
        self.session.pause(&mut self.coordinator.mirror(&mut self.overlay));
    }

    /// Returns false when `speed` was rejected
    pub fn set_speed(&mut self, speed: f64) -> bool {
        self.session
            .set_speed(speed, &mut self.coordinator.mirror(&mut self.overlay))
    }

    pub fn seek(&mut self, time: f64, completion: Option<SeekCompletion>) -> Result<SeekToken> {
        self.session
            .seek(time, completion, &mut self.coordinator.mirror(&mut self.overlay))
    }

    pub fn switch_item(&mut self, direction: Direction) -> Result<MediaReference> {
        self.session
            .switch_item(direction, &mut self.coordinator.mirror(&mut self.overlay))
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        info!("Loop mode {}", if enabled { "enabled" } else { "disabled" });
        self.session
            .set_loop_enabled(enabled, &mut self.coordinator.mirror(&mut self.overlay));
        self.coordinator.push_live_mode(enabled, self.session.duration());
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        info!("Auto-advance {}", if enabled { "enabled" } else { "disabled" });
        self.session.set_auto_advance(enabled);
    }

    /// Mirror the engine's buffering condition
    pub fn set_stalled(&mut self, stalled: bool) {
        self.session.set_stalled(stalled);
        self.coordinator.push_stalled(stalled);
    }

    // Floating presentation

    pub fn prepare(&mut self) -> Result<()> {
        let result = self.coordinator.prepare(&self.session, &self.surface);
        if let Err(e) = &result {
            warn!("Cannot prepare floating presentation: {}", e);
        }
        result
    }

    pub fn start(&mut self) -> Result<()> {
        self.coordinator.start(&self.session, &self.surface)
    }

    pub fn stop(&mut self) {
        self.coordinator.stop();
    }

    pub fn stop_and_restore(&mut self) {
        self.coordinator.stop_and_restore();
    }

    pub fn hide(&mut self) {
        self.coordinator.hide();
    }

    pub fn resume(&mut self) {
        self.coordinator.resume();
    }

    // Floating configuration

    pub fn set_auto_start_on_background(&mut self, enabled: bool) {
        self.coordinator.set_option(PipOption::AutoStartOnBackground(enabled));
    }

    pub fn set_controls_hidden(&mut self, hidden: bool) {
        self.coordinator.set_option(PipOption::ControlsHidden(hidden));
    }

    pub fn set_pause_on_exit(&mut self, enabled: bool) {
        self.coordinator.set_option(PipOption::PauseOnExit(enabled));
    }

    pub fn set_pause_on_screen_lock(&mut self, enabled: bool) {
        self.coordinator.set_option(PipOption::PauseOnScreenLock(enabled));
    }

    pub fn set_pause_on_playback_end(&mut self, enabled: bool) {
        self.coordinator.set_option(PipOption::PauseOnPlaybackEnd(enabled));
    }

    pub fn set_use_low_level_frame_backend(&mut self, enabled: bool) {
        self.coordinator.set_option(PipOption::UseLowLevelFrameBackend(enabled));
    }

    pub fn set_notify_stop_on_termination(&mut self, enabled: bool) {
        self.coordinator.set_option(PipOption::NotifyStopOnTermination(enabled));
    }

    // Overlay

    /// Show or hide the custom control overlay
    pub fn set_custom_controls(&mut self, enabled: bool) {
        self.overlay.set_enabled(enabled);
    }

    pub fn tap_overlay(&mut self, now: Instant) -> bool {
        self.overlay.tap(now)
    }

    /// Press an overlay button. The resulting command is queued.
    pub fn press_overlay(&mut self, button: OverlayButton) -> bool {
        self.overlay.press(button).is_some()
    }

    /// Fire due timers
    pub fn tick(&mut self, now: Instant) -> bool {
        self.overlay.tick(now)
    }

    // Inbox

    pub fn event_sender(&self) -> EventSender {
        self.queue.sender()
    }

    /// Handle every message queued so far. Messages posted while handling
    /// wait for the next call. Returns the number handled.
    pub fn process_events(&mut self) -> usize {
        let messages = self.queue.drain();
        let count = messages.len();

        for message in messages {
            if let Err(e) = self.handle_message(message) {
                warn!("Error handling queued message: {}", e);
            }
        }
        count
    }

    /// Process until the inbox stays empty
    pub fn run_until_idle(&mut self) -> usize {
        let mut total = 0;
        for _ in 0..MAX_DRAIN_PASSES {
            let handled = self.process_events();
            if handled == 0 {
                return total;
            }
            total += handled;
        }

        warn!("Inbox still busy after {} passes", MAX_DRAIN_PASSES);
        total
    }

    fn handle_message(&mut self, message: PlayerMessage) -> Result<()> {
        debug!("Handling {:?}", message);

        match message {
            PlayerMessage::Engine(EngineEvent::ItemReady(item)) => {
                if let Some(refresh) = self.session.on_item_ready(item) {
                    info!(
                        "Switched item ready: {:.3}s, {}x{}",
                        refresh.duration, refresh.presentation_size.width, refresh.presentation_size.height
                    );
                    let live = self.session.loop_enabled();
                    if !self.coordinator.refresh_media(refresh, live) {
                        let mut mirror = self.coordinator.mirror(&mut self.overlay);
                        self.session.pause(&mut mirror);
                        self.session.play(&mut mirror)?;
                    }
                }
            }
            PlayerMessage::Engine(EngineEvent::ItemReachedEnd(item)) => {
                self.session
                    .on_item_reached_end(item, &mut self.coordinator.mirror(&mut self.overlay))?;
            }
            PlayerMessage::Engine(EngineEvent::SeekCompleted { token, finished }) => {
                self.session.on_seek_completed(token, finished);
            }
            PlayerMessage::Floating { session, callback } => {
                self.coordinator.handle_callback(
                    session,
                    callback,
                    &mut self.session,
                    &mut self.surface,
                    &mut self.overlay,
                )?;
            }
            PlayerMessage::VideoReset(result) => {
                self.coordinator
                    .on_video_reset(result, &mut self.session, &mut self.overlay)?;
            }
            PlayerMessage::Overlay(command) => match command {
                OverlayCommand::Play => self.play()?,
                OverlayCommand::Pause => self.pause(),
                OverlayCommand::Next => {
                    self.switch_item(Direction::Forward)?;
                }
                OverlayCommand::Previous => {
                    self.switch_item(Direction::Backward)?;
                }
            },
        }
        Ok(())
    }

    // Accessors

    pub fn state(&self) -> PlaybackState {
        self.session.state()
    }

    pub fn lifecycle(&self) -> PipLifecycleState {
        self.coordinator.state()
    }

    pub fn pip_config(&self) -> PipConfiguration {
        *self.pip_config.read()
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn surface(&self) -> &PresentationSurface {
        &self.surface
    }

    pub fn overlay(&self) -> &ControlOverlay {
        &self.overlay
    }

    pub fn coordinator(&self) -> &PipCoordinator {
        &self.coordinator
    }

    pub fn embedded_host(&self) -> HostId {
        self.embedded_host
    }
}

impl std::fmt::Debug for PlayerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerController")
            .field("session", &self.session)
            .field("coordinator", &self.coordinator)
            .field("surface", &self.surface.ownership())
            .field("queued", &self.queue.len())
            .finish()
    }
}
