//! Discovery of the yt-dlp and ffmpeg executables
//!
//! Lookup order for each tool:
//! 1. An explicit path from [`ToolsConfig`]
//! 2. The bundled locations for the [`RuntimeEnvironment`]
//! 3. A `PATH` search via the `which` crate (when `search_path` is enabled)
//!
//! A tool that is not found is not an error. yt-dlp then falls back to its bare
//! name so the OS resolves it at spawn time; ffmpeg is simply left for yt-dlp to
//! locate on its own.

use crate::config::{RuntimeEnvironment, ToolsConfig};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static TOOL_PATHS: OnceLock<ToolPaths> = OnceLock::new();

/// External executables used by a download
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    /// The downloader
    YtDlp,
    /// The transcoder
    Ffmpeg,
}

impl Tool {
    /// Name without platform suffix
    pub fn base_name(self) -> &'static str {
        match self {
            Tool::YtDlp => "yt-dlp",
            Tool::Ffmpeg => "ffmpeg",
        }
    }

    /// File name on the host platform (`.exe` suffix on Windows)
    pub fn executable_name(self) -> String {
        if cfg!(windows) {
            format!("{}.exe", self.base_name())
        } else {
            self.base_name().to_string()
        }
    }

    /// Where a bundled copy lives for the given environment
    pub fn bundled_path(self, environment: &RuntimeEnvironment) -> PathBuf {
        match environment {
            RuntimeEnvironment::Development { project_root } => {
                project_root.join("local_bin").join(self.executable_name())
            }
            RuntimeEnvironment::Packaged { resources_dir } => {
                resources_dir.join("bin").join(self.executable_name())
            }
        }
    }

    /// Every bundled location to try, most preferred first
    ///
    /// ffmpeg is also looked up where the npm `ffmpeg-static` package puts it,
    /// so front ends that ship that package need no extra copy. In a packaged
    /// build the package sits under `app.asar.unpacked`.
    pub fn bundled_paths(self, environment: &RuntimeEnvironment) -> Vec<PathBuf> {
        let mut paths = vec![self.bundled_path(environment)];
        if self == Tool::Ffmpeg {
            let node_modules = match environment {
                RuntimeEnvironment::Development { project_root } => {
                    project_root.join("node_modules")
                }
                RuntimeEnvironment::Packaged { resources_dir } => {
                    resources_dir.join("app.asar.unpacked").join("node_modules")
                }
            };
            paths.push(node_modules.join("ffmpeg-static").join(self.executable_name()));
        }
        paths
    }
}

/// Resolved executable locations
///
/// `None` means the tool was not found in any location.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolPaths {
    /// Absolute path to yt-dlp
    pub ytdlp: Option<PathBuf>,
    /// Absolute path to ffmpeg
    pub ffmpeg: Option<PathBuf>,
}

impl ToolPaths {
    /// Resolve both tools for the given configuration
    pub fn resolve(config: &ToolsConfig) -> Self {
        let ytdlp = locate(Tool::YtDlp, config.ytdlp_path.as_deref(), config);
        let ffmpeg = locate(Tool::Ffmpeg, config.ffmpeg_path.as_deref(), config);

        match &ytdlp {
            Some(path) => tracing::info!(path = %path.display(), "Using yt-dlp binary"),
            None => tracing::warn!(
                "yt-dlp binary was not found in the expected locations, falling back to system PATH"
            ),
        }
        match &ffmpeg {
            Some(path) => tracing::info!(path = %path.display(), "Using ffmpeg binary"),
            None => tracing::warn!(
                "ffmpeg binary was not found in the expected locations, falling back to system ffmpeg if available"
            ),
        }

        Self { ytdlp, ffmpeg }
    }

    /// Process-wide cached resolution
    ///
    /// The first call resolves with its `config`; later calls return the cached
    /// paths and ignore their argument.
    pub fn global(config: &ToolsConfig) -> &'static ToolPaths {
        TOOL_PATHS.get_or_init(|| Self::resolve(config))
    }

    /// The program to spawn for yt-dlp
    ///
    /// The resolved path if there is one, otherwise the bare executable name.
    pub fn ytdlp_program(&self) -> PathBuf {
        self.ytdlp
            .clone()
            .unwrap_or_else(|| PathBuf::from(Tool::YtDlp.executable_name()))
    }
}

fn locate(tool: Tool, explicit: Option<&Path>, config: &ToolsConfig) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(absolutize(path));
    }

    for bundled in tool.bundled_paths(&config.environment) {
        if bundled.is_file() {
            return Some(absolutize(&bundled));
        }
        tracing::debug!(
            tool = tool.base_name(),
            path = %bundled.display(),
            "No bundled binary"
        );
    }

    if config.search_path {
        return which::which(tool.base_name()).ok();
    }

    None
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
