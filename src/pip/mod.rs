//! Picture-in-picture module for pipsync
//!
//! Interfaces to the floating presentation system and the lifecycle
//! coordinator that keeps it consistent with the playback session.
//! The floating system is reached only through [`FloatingPresentation`];
//! it calls back through the non-owning [`PipDelegate`] handle.

mod coordinator;

pub use coordinator::{DelegateLink, FloatingMirror, PipCoordinator};

use crate::player::SeekCompletion;
use crate::surface::{HostId, Rect, Size, SurfaceId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

/// Floating presentation configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipConfiguration {
    /// Start floating automatically when the app goes to the background
    pub auto_start_on_background: bool,

    /// Hide the floating window's playback controls
    pub controls_hidden: bool,

    /// Pause playback when the floating window is closed
    pub pause_on_exit: bool,

    /// Pause playback when the screen locks
    pub pause_on_screen_lock: bool,

    /// Pause the floating timeline when playback reaches the end
    pub pause_on_playback_end: bool,

    /// Render through the sample-buffer backend
    pub use_low_level_frame_backend: bool,

    /// Deliver a stop callback when the app is terminated
    pub notify_stop_on_termination: bool,
}

impl Default for PipConfiguration {
    fn default() -> Self {
        Self {
            auto_start_on_background: true,
            controls_hidden: false,
            pause_on_exit: false,
            pause_on_screen_lock: false,
            pause_on_playback_end: false,
            use_low_level_frame_backend: true,
            notify_stop_on_termination: true,
        }
    }
}

impl PipConfiguration {
    /// Every field as an option, in declaration order
    pub fn options(&self) -> [PipOption; 7] {
        [
            PipOption::AutoStartOnBackground(self.auto_start_on_background),
            PipOption::ControlsHidden(self.controls_hidden),
            PipOption::PauseOnExit(self.pause_on_exit),
            PipOption::PauseOnScreenLock(self.pause_on_screen_lock),
            PipOption::PauseOnPlaybackEnd(self.pause_on_playback_end),
            PipOption::UseLowLevelFrameBackend(self.use_low_level_frame_backend),
            PipOption::NotifyStopOnTermination(self.notify_stop_on_termination),
        ]
    }

    /// Write a single field
    pub fn apply(&mut self, option: PipOption) {
        match option {
            PipOption::AutoStartOnBackground(v) => self.auto_start_on_background = v,
            PipOption::ControlsHidden(v) => self.controls_hidden = v,
            PipOption::PauseOnExit(v) => self.pause_on_exit = v,
            PipOption::PauseOnScreenLock(v) => self.pause_on_screen_lock = v,
            PipOption::PauseOnPlaybackEnd(v) => self.pause_on_playback_end = v,
            PipOption::UseLowLevelFrameBackend(v) => self.use_low_level_frame_backend = v,
            PipOption::NotifyStopOnTermination(v) => self.notify_stop_on_termination = v,
        }
    }
}

/// Configuration owned by the host and referenced by the coordinator
pub type SharedPipConfig = Arc<RwLock<PipConfiguration>>;

/// One configuration field with its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipOption {
    AutoStartOnBackground(bool),
    ControlsHidden(bool),
    PauseOnExit(bool),
    PauseOnScreenLock(bool),
    PauseOnPlaybackEnd(bool),
    UseLowLevelFrameBackend(bool),
    NotifyStopOnTermination(bool),
}

/// Coordinator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipLifecycleState {
    /// No floating session
    Idle,

    /// Floating handle configured, not presenting
    Prepared,

    /// Floating presentation requested or on screen
    Active,

    /// Surface is being returned to its embedded host
    Restoring,
}

/// Completion for [`FloatingPresentation::reset_video`]
pub type ResetCompletion = Box<dyn FnOnce(Result<(), String>) + Send>;

/// Floating presentation handle (system service)
pub trait FloatingPresentation: Send + Sync {
    /// Install the callback target. The handle must not keep it alive.
    fn set_delegate(&self, delegate: Weak<dyn PipDelegate>);

    fn set_content_surface(&self, surface: SurfaceId);

    /// Host the surface is embedded in, used as reference for restore areas
    fn set_source_host(&self, host: Option<HostId>);

    /// Seconds; 0 presents as live
    fn set_duration(&self, duration: f64);

    fn set_video_size(&self, size: Size);

    /// 0 means paused
    fn set_rate(&self, rate: f64);

    /// Pure speed, independent of pause state
    fn set_speed(&self, speed: f64);

    fn set_enable_seek(&self, enabled: bool);

    fn set_stalled(&self, stalled: bool);

    fn set_restore_areas(&self, background: Rect, foreground: Rect);

    fn set_option(&self, option: PipOption);

    /// Register with the system without presenting
    fn prepare_presentation(&self);

    fn start(&self);

    fn stop(&self);

    /// Stop and report the stop as a restore
    fn stop_and_restore(&self);

    fn hide_and_pause(&self);

    fn resume(&self);

    fn seek(&self, time: f64);

    /// Rebuild the floating timeline after duration or size changed
    fn reset_video(&self, completion: ResetCompletion);
}

/// Callbacks from the floating system
pub trait PipDelegate: Send + Sync {
    /// Current playback time in seconds. Must not block.
    fn current_time(&self) -> f64;

    fn seek_requested(&self, time: f64, completion: Option<SeekCompletion>);

    fn play_pause_toggled(&self, playing: bool);

    fn will_start(&self);

    fn did_start(&self);

    fn failed_to_start(&self, error: String);

    fn did_stop(&self, is_restore: bool);
}

/// Device-level resources held while floating
pub trait DeviceSession: Send + Sync {
    fn end_remote_control_events(&self);

    fn set_audio_exclusive(&self, exclusive: bool);
}

/// Floating system callback queued for the main loop
pub enum PipCallback {
    SeekRequested {
        time: f64,
        completion: Option<SeekCompletion>,
    },
    PlayPauseToggled(bool),
    WillStart,
    DidStart,
    FailedToStart(String),
    DidStop {
        is_restore: bool,
    },
}

impl fmt::Debug for PipCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipCallback::SeekRequested { time, completion } => f
                .debug_struct("SeekRequested")
                .field("time", time)
                .field("has_completion", &completion.is_some())
                .finish(),
            PipCallback::PlayPauseToggled(playing) => f.debug_tuple("PlayPauseToggled").field(playing).finish(),
            PipCallback::WillStart => f.write_str("WillStart"),
            PipCallback::DidStart => f.write_str("DidStart"),
            PipCallback::FailedToStart(err) => f.debug_tuple("FailedToStart").field(err).finish(),
            PipCallback::DidStop { is_restore } => {
                f.debug_struct("DidStop").field("is_restore", is_restore).finish()
            }
        }
    }
}
