//! Configuration management for pipsync
//!
//! This module handles loading and managing application configuration
//! from config files and environment variables.

use crate::pip::PipConfiguration;
use crate::player::MediaReference;
use crate::utils::error::{IntoPipError, PipSyncError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Playlist and playback modes
    pub playback: PlaybackConfig,

    /// Floating presentation options
    pub pip: PipConfiguration,

    /// Embedded host region
    pub surface: SurfaceConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Ordered media locators
    pub playlist: Vec<MediaReference>,

    /// Speed applied on play (1.0 = normal)
    pub default_speed: f64,

    /// Treat the end of an item as a loop point
    pub loop_enabled: bool,

    /// Continue with the next item at the end
    pub auto_advance: bool,

    /// Show the custom control overlay
    pub custom_controls: bool,
}

/// Host region the surface is embedded in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub host_width: f64,
    pub host_height: f64,
}

/// General application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            playlist: vec![
                MediaReference::new("demo://intro"),
                MediaReference::new("demo://feature"),
                MediaReference::new("demo://credits"),
            ],
            default_speed: 1.0,
            loop_enabled: false,
            auto_advance: false,
            custom_controls: true,
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            host_width: 640.0,
            host_height: 360.0,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/pipsync/config.toml on Linux)
    /// 3. User config file (~/.config/pipsync/config.toml on Linux)
    /// 4. `explicit`, when given
    /// 5. Environment variables (PIPSYNC_* prefix)
    pub fn load_with(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config.merge_from_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config.merge_from_file(&user_path)?;
            }
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(PipSyncError::NotFound(format!("Config file {}", path.display())));
            }
            config.merge_from_file(path)?;
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).config_err("Failed to create config directory")?;
        }

        let toml = toml::to_string_pretty(self).config_err("Failed to serialize config")?;
        std::fs::write(path, toml).config_err("Failed to write config file")?;

        Ok(())
    }

    /// Merge configuration from a TOML file. Keys absent from the file keep
    /// their current values.
    fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        debug!("Merging config from {}", path.display());

        let contents = std::fs::read_to_string(path).config_err("Failed to read config file")?;
        let overlay: toml::Value = toml::from_str(&contents).config_err("Failed to parse config file")?;

        let mut base = toml::Value::try_from(&*self).config_err("Failed to serialize config")?;
        merge_values(&mut base, overlay);

        *self = base.try_into().config_err("Invalid config file")?;
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(speed) = std::env::var("PIPSYNC_SPEED") {
            self.playback.default_speed = speed.parse().config_err("Invalid PIPSYNC_SPEED")?;
        }

        if let Ok(value) = std::env::var("PIPSYNC_LOOP") {
            self.playback.loop_enabled = parse_flag(&value, "PIPSYNC_LOOP")?;
        }

        if let Ok(value) = std::env::var("PIPSYNC_AUTO_ADVANCE") {
            self.playback.auto_advance = parse_flag(&value, "PIPSYNC_AUTO_ADVANCE")?;
        }

        if let Ok(log_level) = std::env::var("PIPSYNC_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(self.playback.default_speed > 0.0) {
            return Err(PipSyncError::Config("Default speed must be positive".to_string()));
        }

        if self.playback.playlist.is_empty() {
            return Err(PipSyncError::Config("Playlist must not be empty".to_string()));
        }

        if !(self.surface.host_width > 0.0 && self.surface.host_height > 0.0) {
            return Err(PipSyncError::Config("Host region dimensions must be non-zero".to_string()));
        }

        if !VALID_LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(PipSyncError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level, VALID_LOG_LEVELS
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/pipsync/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA")
            .ok()
            .map(|p| PathBuf::from(p).join("pipsync").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/pipsync/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pipsync").join("config.toml"))
    }
}

fn parse_flag(value: &str, name: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(PipSyncError::Config(format!("Invalid {}: '{}'", name, other))),
    }
}

/// Recursively overwrite `base` with the keys present in `overlay`
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
