//! Player module for pipsync
//!
//! This module owns everything on the playback side: the playlist, the
//! playback session wrapping the external engine, and the controller that
//! ties the session to the surface, the overlay and the floating
//! presentation.

mod controller;
mod playlist;
mod session;

pub use controller::{PlayerController, PlayerControllerBuilder};
pub use playlist::{Direction, Playlist, PlaylistNavigator, PlaylistProvider};
pub use session::{MediaRefresh, PlaybackSession, REPLAY_EPSILON};

use crate::surface::{Size, SurfaceId};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque locator for a media item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaReference(String);

impl MediaReference {
    pub fn new<S: Into<String>>(locator: S) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaReference {
    fn from(locator: &str) -> Self {
        Self::new(locator)
    }
}

/// Identity of one loaded playback unit. A new id is issued on every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

/// Correlates a seek request with its completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeekToken(pub u64);

/// Seek accuracy requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekTolerance {
    /// Land exactly on the requested time
    Exact,
}

/// Callback fired exactly once when a seek settles
pub type SeekCompletion = Box<dyn FnOnce() + Send>;

/// Snapshot of the playback state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub current_item: Option<MediaReference>,

    /// 0 means paused
    pub rate: f64,

    /// Speed applied on the next play, always > 0
    pub requested_speed: f64,

    /// Seconds
    pub current_time: f64,

    /// Seconds
    pub duration: f64,

    pub presentation_size: Size,
    pub loop_enabled: bool,
    pub auto_advance: bool,
    pub stalled: bool,
}

/// Asynchronous notifications posted by the playback engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Item finished loading and reports its duration and size
    ItemReady(ItemId),

    /// Item played to its end
    ItemReachedEnd(ItemId),

    /// Seek settled, either finished or superseded
    SeekCompleted { token: SeekToken, finished: bool },
}

/// Playback engine trait (decode/render pipeline owned elsewhere)
pub trait PlaybackEngine: Send + Sync {
    /// Replace the current playback unit with a new one for `media`
    fn load(&self, media: &MediaReference) -> Result<ItemId>;

    /// Render the current unit into `surface`
    fn attach_surface(&self, surface: SurfaceId);

    /// Set playback rate (0 pauses)
    fn set_rate(&self, rate: f64);

    /// Start a seek; completion is reported with `EngineEvent::SeekCompleted`
    fn seek(&self, time: f64, tolerance: SeekTolerance, token: SeekToken);

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Duration of the current unit in seconds, 0 until ready
    fn duration(&self) -> f64;

    /// Natural size of the current unit
    fn presentation_size(&self) -> Size;
}

/// Receives playback changes that must be mirrored outside the session
pub trait PlaybackMirror {
    /// Play state changed; `rate` is 0 when paused
    fn playback_changed(&mut self, playing: bool, rate: f64);

    /// Requested speed changed
    fn speed_changed(&mut self, speed: f64);

    /// A finished item is being replayed from the start
    fn seek_to_start(&mut self);
}

/// Mirror that drops every change
#[derive(Debug, Default)]
pub struct NoMirror;

impl PlaybackMirror for NoMirror {
    fn playback_changed(&mut self, _playing: bool, _rate: f64) {}
    fn speed_changed(&mut self, _speed: f64) {}
    fn seek_to_start(&mut self) {}
}
