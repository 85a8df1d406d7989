//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the application is running from
///
/// Decides which locations are searched for bundled `yt-dlp`/`ffmpeg` binaries.
/// See [`ToolPaths::resolve`](crate::tools::ToolPaths::resolve).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RuntimeEnvironment {
    /// Running from a source checkout; binaries live in `<project_root>/local_bin`
    Development {
        /// Root of the checkout
        project_root: PathBuf,
    },
    /// Running from an installed package; binaries live in `<resources_dir>/bin`
    Packaged {
        /// The package's resources directory
        resources_dir: PathBuf,
    },
}

impl Default for RuntimeEnvironment {
    fn default() -> Self {
        Self::Development {
            project_root: PathBuf::from("."),
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg) and lookup behavior
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for binaries not found in the bundled locations (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Development checkout or packaged install (default: development rooted at ".")
    #[serde(default)]
    pub environment: RuntimeEnvironment,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
            environment: RuntimeEnvironment::default(),
        }
    }
}

/// Download behavior configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Folder suggested to the user when none has been picked yet
    /// (default: the platform download directory, or "./downloads")
    #[serde(default = "default_output_dir")]
    pub default_output_dir: PathBuf,

    /// File name template handed to yt-dlp (default: "%(title)s.%(ext)s")
    ///
    /// Placeholders are expanded by yt-dlp, never by this crate.
    #[serde(default = "default_filename_template")]
    pub filename_template: String,

    /// Number of trailing stderr lines kept for failure reports (default: 50)
    ///
    /// 0 keeps none; stderr is still logged.
    #[serde(default = "default_max_diagnostic_lines")]
    pub max_diagnostic_lines: usize,

    /// How long shutdown waits for cancelled jobs to reap their processes (default: 10 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            default_output_dir: default_output_dir(),
            filename_template: default_filename_template(),
            max_diagnostic_lines: default_max_diagnostic_lines(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Main configuration for MediaDownloader
///
/// Fields are organized into sub-configs:
/// - [`tools`](ToolsConfig) - external binary paths and lookup
/// - [`download`](DownloadConfig) - output naming, diagnostics, shutdown
///
/// Both sub-configs are flattened, so the JSON format has no nesting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// External tool paths and lookup behavior
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Missing fields take their defaults. The loaded configuration is validated
    /// before it is returned.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would make every job fail
    pub fn validate(&self) -> Result<()> {
        if self.download.filename_template.trim().is_empty() {
            return Err(Error::Config {
                message: "filename template must not be empty".to_string(),
                key: Some("filename_template".to_string()),
            });
        }

        Ok(())
    }

    /// Default output folder
    pub fn default_output_dir(&self) -> &PathBuf {
        &self.download.default_output_dir
    }
}

// Default value functions
fn default_output_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("downloads"))
}

fn default_filename_template() -> String {
    "%(title)s.%(ext)s".to_string()
}

fn default_max_diagnostic_lines() -> usize {
    50
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
