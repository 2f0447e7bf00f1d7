//! Utility module for pipsync
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Configuration management
//! - Common helper functions

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::{Config, GeneralConfig, PlaybackConfig, SurfaceConfig};
pub use error::{PipSyncError, Result};

/// Initialize the application configuration
///
/// Loads configuration from defaults, the system file, the user file,
/// `explicit` when given, then environment variables.
pub fn load_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    Config::load_with(explicit)
}

/// Format a playback position for log lines
///
/// Returns "MM:SS.mmm", or "HH:MM:SS.mmm" from one hour on. Negative and
/// non-finite values are shown as zero.
pub fn format_timestamp(seconds: f64) -> String {
    let millis = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };

    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let secs = (millis % 60_000) / 1000;
    let ms = millis % 1000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, ms)
    }
}
