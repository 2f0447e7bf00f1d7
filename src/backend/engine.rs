//! Simulated playback engine
//!
//! Keeps a virtual clock that only moves when [`SimulatedEngine::advance`]
//! is called. Loads become ready immediately and seeks settle immediately;
//! both are reported through the event inbox like a real engine would.

use crate::events::EventSender;
use crate::player::{EngineEvent, ItemId, MediaReference, PlaybackEngine, SeekToken, SeekTolerance};
use crate::surface::{Size, SurfaceId};
use crate::utils::error::{IntoPipError, Result};
use log::{debug, trace};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Duration of items without a registered profile (seconds)
pub const DEFAULT_DURATION: f64 = 10.0;

/// Size of items without a registered profile
pub const DEFAULT_PRESENTATION_SIZE: Size = Size {
    width: 1920.0,
    height: 1080.0,
};

#[derive(Debug, Clone, Copy)]
struct MediaProfile {
    duration: f64,
    size: Size,
}

#[derive(Debug)]
struct LoadedItem {
    id: ItemId,
    profile: MediaProfile,
}

#[derive(Debug, Default)]
struct EngineInner {
    next_item: u64,
    current: Option<LoadedItem>,
    position: f64,
    rate: f64,
    surface: Option<SurfaceId>,
    ended: bool,
    load_count: usize,
    seeks: Vec<(f64, SeekTolerance)>,
}

/// Playback engine driven by an explicit clock
pub struct SimulatedEngine {
    inner: Mutex<EngineInner>,
    profiles: HashMap<MediaReference, MediaProfile>,
    events: EventSender,
}

impl SimulatedEngine {
    pub fn new(events: EventSender) -> Self {
        Self {
            inner: Mutex::new(EngineInner::default()),
            profiles: HashMap::new(),
            events,
        }
    }

    /// Register duration and size for a locator
    pub fn with_profile(mut self, media: impl Into<MediaReference>, duration: f64, size: Size) -> Self {
        self.profiles.insert(media.into(), MediaProfile { duration, size });
        self
    }

    /// Move the clock forward by `dt` seconds of wall time
    pub fn advance(&self, dt: f64) {
        let ended = {
            let mut inner = self.inner.lock();
            let (id, duration) = match &inner.current {
                Some(item) => (item.id, item.profile.duration),
                None => return,
            };
            if inner.rate <= 0.0 || inner.ended {
                return;
            }

            inner.position = (inner.position + dt * inner.rate).min(duration);
            trace!("Simulated clock at {:.3}s", inner.position);

            if inner.position >= duration {
                inner.ended = true;
                Some(id)
            } else {
                None
            }
        };

        if let Some(id) = ended {
            debug!("Simulated item {:?} reached its end", id);
            self.events.engine(EngineEvent::ItemReachedEnd(id));
        }
    }

    /// Place the clock without going through a seek
    pub fn set_position(&self, time: f64) {
        let mut inner = self.inner.lock();
        let duration = inner.current.as_ref().map(|i| i.profile.duration).unwrap_or(0.0);
        inner.position = time.clamp(0.0, duration);
        inner.ended = false;
    }

    pub fn rate(&self) -> f64 {
        self.inner.lock().rate
    }

    pub fn attached_surface(&self) -> Option<SurfaceId> {
        self.inner.lock().surface
    }

    pub fn load_count(&self) -> usize {
        self.inner.lock().load_count
    }

    /// Every seek issued so far with its tolerance
    pub fn seek_log(&self) -> Vec<(f64, SeekTolerance)> {
        self.inner.lock().seeks.clone()
    }

    fn profile(&self, media: &MediaReference) -> MediaProfile {
        self.profiles.get(media).copied().unwrap_or(MediaProfile {
            duration: DEFAULT_DURATION,
            size: DEFAULT_PRESENTATION_SIZE,
        })
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn load(&self, media: &MediaReference) -> Result<ItemId> {
        if media.as_str().trim().is_empty() {
            return Err::<ItemId, _>("empty locator").engine_err("Loading media");
        }

        let profile = self.profile(media);
        let id = {
            let mut inner = self.inner.lock();
            inner.next_item += 1;
            let id = ItemId(inner.next_item);
            inner.current = Some(LoadedItem { id, profile });
            inner.position = 0.0;
            inner.ended = false;
            inner.load_count += 1;
            id
        };

        debug!("Simulated engine loaded {} as {:?}", media, id);
        self.events.engine(EngineEvent::ItemReady(id));
        Ok(id)
    }

    fn attach_surface(&self, surface: SurfaceId) {
        self.inner.lock().surface = Some(surface);
    }

    fn set_rate(&self, rate: f64) {
        self.inner.lock().rate = rate;
    }

    fn seek(&self, time: f64, tolerance: SeekTolerance, token: SeekToken) {
        {
            let mut inner = self.inner.lock();
            let duration = inner.current.as_ref().map(|i| i.profile.duration).unwrap_or(0.0);
            inner.position = time.clamp(0.0, duration);
            inner.ended = inner.current.is_some() && inner.position >= duration;
            inner.seeks.push((time, tolerance));
        }

        self.events.engine(EngineEvent::SeekCompleted { token, finished: true });
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().position
    }

    fn duration(&self) -> f64 {
        let inner = self.inner.lock();
        inner.current.as_ref().map(|i| i.profile.duration).unwrap_or(0.0)
    }

    fn presentation_size(&self) -> Size {
        let inner = self.inner.lock();
        inner.current.as_ref().map(|i| i.profile.size).unwrap_or(Size::ZERO)
    }
}

impl std::fmt::Debug for SimulatedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedEngine")
            .field("inner", &*self.inner.lock())
            .finish()
    }
}
