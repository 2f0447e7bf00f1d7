//! Error types for pipsync
//!
//! This module defines the error types used throughout the crate.
//! We use thiserror for the library error type and anyhow for
//! application-level error handling in the binary.

use thiserror::Error;

/// Main error type for pipsync
#[derive(Error, Debug)]
pub enum PipSyncError {
    /// Playback engine errors
    #[error("Engine error: {0}")]
    Engine(String),

    /// Floating presentation errors
    #[error("Floating presentation error: {0}")]
    Floating(String),

    /// Presentation surface errors
    #[error("Surface error: {0}")]
    Surface(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl PipSyncError {
    /// Create a surface error from string
    pub fn surface_error<S: Into<String>>(msg: S) -> Self {
        PipSyncError::Surface(msg.into())
    }
}

/// Convenience type alias for Results in pipsync
pub type Result<T> = std::result::Result<T, PipSyncError>;

/// Extension trait for converting other errors to PipSyncError
pub trait IntoPipError<T> {
    /// Convert this error into a PipSyncError with the given context
    fn engine_err(self, context: &str) -> Result<T>;
    fn floating_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoPipError<T> for std::result::Result<T, E> {
    fn engine_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PipSyncError::Engine(format!("{}: {}", context, e)))
    }

    fn floating_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PipSyncError::Floating(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PipSyncError::Config(format!("{}: {}", context, e)))
    }
}
