//! Core types for media-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Unique identifier for a download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Requested output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// Video merged into an mp4 container
    #[serde(alias = "video")]
    Mp4,
    /// Video merged into an mkv container
    Mkv,
    /// Audio only, re-encoded to mp3
    Mp3,
}

impl MediaFormat {
    /// Whether only the audio stream is fetched
    pub fn is_audio_only(self) -> bool {
        matches!(self, Self::Mp3)
    }

    /// The container audio and video are merged into, if any
    pub fn merge_container(self) -> Option<&'static str> {
        match self {
            Self::Mp4 => Some("mp4"),
            Self::Mkv => Some("mkv"),
            Self::Mp3 => None,
        }
    }
}

impl std::str::FromStr for MediaFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" | "video" => Ok(Self::Mp4),
            "mkv" => Ok(Self::Mkv),
            "mp3" => Ok(Self::Mp3),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Mp3 => "mp3",
        };
        f.write_str(name)
    }
}

/// One user-initiated download
///
/// The caller validates that `output_folder` exists and is writable before
/// submitting; the downloader does not touch the filesystem on its behalf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// URL of the media page
    pub source_url: String,
    /// Output format
    pub format: MediaFormat,
    /// Quality token: "best", "4k", "8k" or "<N>p"
    pub quality: String,
    /// Absolute folder the file is written to
    pub output_folder: PathBuf,
    /// Netscape cookies file handed to yt-dlp verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies_path: Option<PathBuf>,
}

impl DownloadRequest {
    /// Create a request without a cookies file
    pub fn new(
        source_url: impl Into<String>,
        format: MediaFormat,
        quality: impl Into<String>,
        output_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            format,
            quality: quality.into(),
            output_folder: output_folder.into(),
            cookies_path: None,
        }
    }

    /// Attach a cookies file
    pub fn with_cookies(mut self, cookies_path: impl Into<PathBuf>) -> Self {
        self.cookies_path = Some(cookies_path.into());
        self
    }
}

/// Progress update parsed from the downloader's output
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Percent complete as reported (0.0 to 100.0)
    pub percent: f64,
}

/// Lifecycle state of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Submitted, not yet started
    Idle,
    /// Translating the request into downloader flags
    Planning,
    /// Starting the external process
    Spawning,
    /// External process running, output being parsed
    Running,
    /// Finished; the outcome is available
    Terminated,
}

/// Terminal result of a job, produced exactly once
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobOutcome {
    /// yt-dlp exited with code 0
    Success {
        /// Folder the file was written to
        output_folder: PathBuf,
    },
    /// yt-dlp ran and exited non-zero, or was killed by a signal
    Failure {
        /// Exit code (128 + signal for signal terminations, -1 if unknown)
        exit_code: i32,
        /// Human-readable error message
        message: String,
        /// Trailing stderr lines, verbatim
        diagnostics: Vec<String>,
    },
    /// yt-dlp could not be started
    SpawnError {
        /// Error message
        message: String,
    },
    /// The request could not be translated into an invocation
    PlanningFailed {
        /// Error message
        message: String,
    },
    /// The job was cancelled before the process finished
    Cancelled,
}

impl JobOutcome {
    /// Whether the download succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Message to show the user verbatim, if the job did not succeed
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message, .. }
            | Self::SpawnError { message }
            | Self::PlanningFailed { message } => Some(message),
            Self::Cancelled => Some("download cancelled"),
        }
    }
}
