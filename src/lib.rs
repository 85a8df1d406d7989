//! # media-dl
//!
//! Download-job orchestration core for yt-dlp based media downloaders.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding in a front end
//! - **One job, one process** - Every request runs its own yt-dlp process; nothing is merged or retried
//! - **Never silent** - Every job ends in exactly one [`JobOutcome`]
//! - **Portable** - Bundled or system-installed yt-dlp and ffmpeg are found on every platform
//!
//! A job goes through four stages:
//! 1. [`planner`] turns the format and quality choice into yt-dlp flags
//! 2. [`invocation`] assembles the command line
//! 3. [`supervisor`] runs the process and streams its output
//! 4. [`progress`] extracts percentages from the output lines
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, DownloadRequest, MediaDownloader, MediaFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(Config::default())?;
//!
//!     let request = DownloadRequest::new(
//!         "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
//!         MediaFormat::Mp4,
//!         "1080p",
//!         downloader.default_output_dir(),
//!     );
//!
//!     let outcome = downloader
//!         .download(request, |event: media_dl::ProgressEvent| {
//!             println!("{:.1}%", event.percent);
//!         })
//!         .await?;
//!
//!     println!("Outcome: {:?}", outcome);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Job orchestration (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// yt-dlp command line assembly
pub mod invocation;
/// Format and quality planning
pub mod planner;
/// Progress line parsing
pub mod progress;
/// External process supervision
pub mod supervisor;
/// Executable discovery
pub mod tools;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, RuntimeEnvironment, ToolsConfig};
pub use downloader::{JobHandle, MediaDownloader, ProgressSink};
pub use error::{Error, Result};
pub use invocation::ResolvedInvocation;
pub use planner::{FlagSet, Quality};
pub use supervisor::{CliSupervisor, ProcessCommand, ProcessExit, ProcessSupervisor};
pub use tools::{Tool, ToolPaths};
pub use types::{DownloadRequest, JobId, JobOutcome, JobState, MediaFormat, ProgressEvent};

/// Run the downloader until the process is asked to stop, then shut it down
///
/// Waits for SIGTERM or SIGINT (Ctrl+C elsewhere), logs which jobs are still
/// running, then calls [`MediaDownloader::shutdown`], which kills their yt-dlp
/// processes. If no signal listener can be installed this never returns, so the
/// caller keeps control of when to shut down.
///
/// # Example
///
/// ```no_run
/// use media_dl::{MediaDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MediaDownloader::new(Config::default())?;
///
///     // Submit jobs from elsewhere, then block until a signal arrives
///     run_with_shutdown(downloader).await;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) {
    let signal = wait_for_signal().await;
    let running: Vec<u64> = downloader
        .active_jobs()
        .await
        .iter()
        .map(JobId::get)
        .collect();
    tracing::info!(signal, running_jobs = ?running, "Stop requested, cancelling downloads");
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        },
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register Unix signal handlers, using ctrl_c");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for Ctrl+C, signal shutdown disabled");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}
