//! Error types for media-dl
//!
//! This module provides the crate-wide error type. Errors here describe problems
//! with a request or with the downloader itself (bad configuration, unknown
//! format or quality token, shutdown in progress). The result of a running job
//! is never an [`Error`]: jobs always finish with a [`JobOutcome`](crate::types::JobOutcome).

use crate::types::JobId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Each variant includes enough context to present a useful message to the user
/// without inspecting the variant further.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "filename_template")
        key: Option<String>,
    },

    /// The request itself is malformed (e.g., empty source URL)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unrecognized output format token
    #[error("invalid format '{0}': expected one of mp4, video, mkv, mp3")]
    InvalidFormat(String),

    /// Unrecognized quality token
    #[error("invalid quality '{0}': expected best, 4k, 8k or <N>p")]
    InvalidQuality(String),

    /// The external executable could not be started
    #[error("failed to start {}: {reason}", .executable.display())]
    Spawn {
        /// The executable that was invoked
        executable: PathBuf,
        /// The reason the spawn failed
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Job not found among the active jobs
    #[error("job {0} not found")]
    NotFound(JobId),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,
}

impl Error {
    /// Returns `true` if resubmitting a corrected request can succeed
    ///
    /// Bad format/quality tokens and malformed requests are caller mistakes.
    /// Everything else reflects the environment or the downloader state.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_) | Error::InvalidFormat(_) | Error::InvalidQuality(_)
        )
    }
}
