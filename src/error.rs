//! Error types for the viewer

use thiserror::Error;

/// Result type alias for viewer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing, rasterizing, or presenting a step
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A font or image failed to settle cleanly. Never fatal; the probe logs it.
    #[error("Resource did not load: {0}")]
    ResourceSettle(String),

    /// A single capture configuration failed; the pipeline moves on.
    #[error("Capture attempt {attempt} failed: {reason}")]
    CaptureFailed { attempt: usize, reason: String },

    /// Every configuration in the attempt list failed.
    #[error("Rasterization failed after {attempts} attempt(s): {last}")]
    RasterizationFailed { attempts: usize, last: String },

    /// The result belongs to a generation that has since been superseded
    #[error("Result from generation {0} discarded")]
    Stale(u64),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Failed to render content
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to load a resource
    #[error("Failed to load resource: {0}")]
    LoadError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error is the silent consequence of a newer navigation.
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::Stale(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
