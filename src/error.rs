//! Error kinds surfaced by the replay core

use std::path::PathBuf;

/// Result type for replay operations
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Error types for chat loading, querying, matching and clip extraction
#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    /// The chat export cannot be read as a whole
    #[error("Chat export format error: {0}")]
    Format(String),

    /// A query or clip request with inverted, negative or non-finite bounds
    #[error("Invalid range [{start}, {end}]: {reason}")]
    InvalidRange { start: f64, end: f64, reason: String },

    /// A named file is missing
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The external encoder failed, timed out or could not be started
    #[error("Encoder error: {0}")]
    Encoding(String),

    /// Writing the chat slice artifact failed
    #[error("Chat artifact serialization failed: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReplayError {
    /// Create an invalid range error
    pub fn invalid_range(start: f64, end: f64, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            start,
            end,
            reason: reason.into(),
        }
    }

    /// Create a format error
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format(reason.into())
    }
}
