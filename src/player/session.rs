//! Playback session for pipsync
//!
//! Owns the engine handle for the current media item. Play state changes
//! are mirrored through the [`PlaybackMirror`] passed into each operation.

use crate::player::{
    Direction, ItemId, MediaReference, PlaybackEngine, PlaybackMirror, PlaybackState, PlaylistNavigator,
    SeekCompletion, SeekToken, SeekTolerance,
};
use crate::surface::{Size, SurfaceId};
use crate::utils::error::{PipSyncError, Result};
use crate::utils::format_timestamp;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Distance from the end (seconds) at which `play()` restarts from zero
pub const REPLAY_EPSILON: f64 = 0.001;

/// Duration and size of a newly ready item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaRefresh {
    pub duration: f64,
    pub presentation_size: Size,
}

/// One-shot readiness observation for a switched-in item
#[derive(Debug, Clone, Copy)]
struct ReadinessSubscription {
    item: ItemId,
}

/// Playback session over one engine
pub struct PlaybackSession {
    engine: Arc<dyn PlaybackEngine>,
    navigator: PlaylistNavigator,
    surface: SurfaceId,

    selection: Option<MediaReference>,
    current_item: Option<ItemId>,

    rate: f64,
    requested_speed: f64,
    loop_enabled: bool,
    auto_advance: bool,
    stalled: bool,

    next_seek_token: u64,
    pending_seeks: HashMap<SeekToken, SeekCompletion>,
    readiness: Option<ReadinessSubscription>,
}

impl PlaybackSession {
    /// Create a session with the first playlist item selected
    pub fn new(engine: Arc<dyn PlaybackEngine>, navigator: PlaylistNavigator, surface: SurfaceId) -> Self {
        let selection = navigator.first().cloned();
        Self {
            engine,
            navigator,
            surface,
            selection,
            current_item: None,
            rate: 0.0,
            requested_speed: 1.0,
            loop_enabled: false,
            auto_advance: false,
            stalled: false,
            next_seek_token: 1,
            pending_seeks: HashMap::new(),
            readiness: None,
        }
    }

    pub fn engine(&self) -> &Arc<dyn PlaybackEngine> {
        &self.engine
    }

    pub fn selection(&self) -> Option<&MediaReference> {
        self.selection.as_ref()
    }

    pub fn current_item(&self) -> Option<ItemId> {
        self.current_item
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn requested_speed(&self) -> f64 {
        self.requested_speed
    }

    pub fn is_paused(&self) -> bool {
        self.rate == 0.0
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn current_time(&self) -> f64 {
        if self.current_item.is_some() {
            self.engine.current_time()
        } else {
            0.0
        }
    }

    pub fn duration(&self) -> f64 {
        if self.current_item.is_some() {
            self.engine.duration()
        } else {
            0.0
        }
    }

    pub fn presentation_size(&self) -> Size {
        if self.current_item.is_some() {
            self.engine.presentation_size()
        } else {
            Size::ZERO
        }
    }

    /// Seeks whose completion has not fired yet
    pub fn pending_seek_count(&self) -> usize {
        self.pending_seeks.len()
    }

    /// Whether a readiness observation is still registered
    pub fn is_awaiting_readiness(&self) -> bool {
        self.readiness.is_some()
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_item: self.selection.clone(),
            rate: self.rate,
            requested_speed: self.requested_speed,
            current_time: self.current_time(),
            duration: self.duration(),
            presentation_size: self.presentation_size(),
            loop_enabled: self.loop_enabled,
            auto_advance: self.auto_advance,
            stalled: self.stalled,
        }
    }

    /// Replace the loaded playback unit with a new one for `media`
    pub fn load(&mut self, media: MediaReference) -> Result<ItemId> {
        info!("Loading media: {}", media);

        let item = self.engine.load(&media)?;
        self.engine.attach_surface(self.surface);
        self.engine.set_rate(self.rate);

        self.current_item = Some(item);
        self.selection = Some(media);
        Ok(item)
    }

    /// Resume at the requested speed, loading the selection if needed
    pub fn play(&mut self, mirror: &mut dyn PlaybackMirror) -> Result<()> {
        if self.current_item.is_none() {
            let media = self
                .selection
                .clone()
                .ok_or_else(|| PipSyncError::NotFound("Playlist is empty".to_string()))?;
            self.load(media)?;
        }

        if self.current_time() - self.duration() > -REPLAY_EPSILON && !self.auto_advance {
            debug!("Replaying finished item from the start");
            mirror.seek_to_start();
            self.seek(0.0, None, mirror)?;
        }

        self.rate = self.requested_speed;
        self.engine.set_rate(self.rate);
        mirror.playback_changed(true, self.rate);

        info!("Playback started at {:.2}x", self.rate);
        Ok(())
    }

    pub fn pause(&mut self, mirror: &mut dyn PlaybackMirror) {
        self.rate = 0.0;
        self.engine.set_rate(0.0);
        mirror.playback_changed(false, 0.0);

        info!("Playback paused at {}", format_timestamp(self.current_time()));
    }

    /// Change the requested speed. Non-positive speeds are ignored.
    pub fn set_speed(&mut self, speed: f64, mirror: &mut dyn PlaybackMirror) -> bool {
        if !(speed > 0.0) {
            warn!("Ignoring playback speed {}", speed);
            return false;
        }

        self.requested_speed = speed;
        if !self.is_paused() {
            self.rate = speed;
            self.engine.set_rate(speed);
        }
        mirror.speed_changed(speed);

        info!("Playback speed set to {:.2}x", speed);
        true
    }

    /// Exact seek. Seeking past the end resumes playback first.
    pub fn seek(
        &mut self,
        time: f64,
        completion: Option<SeekCompletion>,
        mirror: &mut dyn PlaybackMirror,
    ) -> Result<SeekToken> {
        if time > self.duration() {
            debug!("Seek target {} beyond duration, resuming playback", format_timestamp(time));
            self.play(mirror)?;
        }

        let token = SeekToken(self.next_seek_token);
        self.next_seek_token += 1;

        if let Some(completion) = completion {
            self.pending_seeks.insert(token, completion);
        }
        self.engine.seek(time, SeekTolerance::Exact, token);

        debug!("Seeking to {} ({:?})", format_timestamp(time), token);
        Ok(token)
    }

    /// Engine reported that a seek settled
    pub fn on_seek_completed(&mut self, token: SeekToken, finished: bool) {
        match self.pending_seeks.remove(&token) {
            Some(completion) => {
                if !finished {
                    debug!("Seek {:?} was superseded", token);
                }
                completion();
            }
            None => debug!("No completion registered for {:?}", token),
        }
    }

    /// Load the neighbouring playlist item and start playing it
    pub fn switch_item(&mut self, direction: Direction, mirror: &mut dyn PlaybackMirror) -> Result<MediaReference> {
        let next = self
            .navigator
            .step(self.selection.as_ref(), direction)
            .ok_or_else(|| PipSyncError::NotFound("Playlist is empty".to_string()))?;

        info!("Switching {:?} to {}", direction, next);

        let item = self.load(next.clone())?;
        self.play(mirror)?;

        // replaces any observation still pending for an earlier switch
        self.readiness = Some(ReadinessSubscription { item });
        Ok(next)
    }

    /// Engine reported an item as ready. Fires at most once per switch.
    pub fn on_item_ready(&mut self, item: ItemId) -> Option<MediaRefresh> {
        match self.readiness {
            Some(subscription) if subscription.item == item => {
                self.readiness = None;
                Some(MediaRefresh {
                    duration: self.duration(),
                    presentation_size: self.presentation_size(),
                })
            }
            _ => {
                debug!("Ignoring readiness of {:?}", item);
                None
            }
        }
    }

    /// Engine reported that `item` reached its end
    pub fn on_item_reached_end(&mut self, item: ItemId, mirror: &mut dyn PlaybackMirror) -> Result<()> {
        if self.current_item != Some(item) {
            debug!("Ignoring end of superseded item {:?}", item);
            return Ok(());
        }

        if self.loop_enabled {
            debug!("Looping {:?}", item);
            let token = SeekToken(self.next_seek_token);
            self.next_seek_token += 1;
            self.engine.seek(0.0, SeekTolerance::Exact, token);

            self.rate = self.requested_speed;
            self.engine.set_rate(self.rate);
            mirror.playback_changed(true, self.rate);
        } else if self.auto_advance {
            self.switch_item(Direction::Forward, mirror)?;
        } else {
            info!("Playback reached the end");
            self.rate = 0.0;
            self.engine.set_rate(0.0);
            mirror.playback_changed(false, 0.0);
        }
        Ok(())
    }

    /// Loop mode treats the end as a loop point and resumes playback
    pub fn set_loop_enabled(&mut self, enabled: bool, mirror: &mut dyn PlaybackMirror) {
        self.loop_enabled = enabled;
        if enabled {
            self.auto_advance = false;
            if self.current_item.is_some() {
                self.rate = self.requested_speed;
                self.engine.set_rate(self.rate);
                mirror.playback_changed(true, self.rate);
            }
        }
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.auto_advance = enabled;
    }

    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("selection", &self.selection)
            .field("current_item", &self.current_item)
            .field("rate", &self.rate)
            .field("requested_speed", &self.requested_speed)
            .field("loop_enabled", &self.loop_enabled)
            .field("auto_advance", &self.auto_advance)
            .finish()
    }
}
