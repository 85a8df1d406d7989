//! Download job orchestration split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`job`] - Per-job state machine: plan, spawn, parse progress, resolve outcome
//! - [`control`] - Cancelling jobs and inspecting the active set
//! - [`lifecycle`] - Shutdown coordination

mod control;
mod job;
mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use job::{JobHandle, ProgressSink};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::supervisor::{CliSupervisor, ProcessSupervisor};
use crate::tools::ToolPaths;
use crate::types::{DownloadRequest, JobId, JobOutcome, JobState};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Registry of running jobs
#[derive(Clone)]
pub(crate) struct JobRegistry {
    /// Map of active jobs to their cancellation tokens (for cancel-by-id and shutdown)
    pub(crate) active_jobs: Arc<tokio::sync::Mutex<HashMap<JobId, CancellationToken>>>,
    /// Last assigned job id
    pub(crate) last_id: Arc<AtomicU64>,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl JobRegistry {
    fn new() -> Self {
        Self {
            active_jobs: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            last_id: Arc::new(AtomicU64::new(0)),
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Every submitted request becomes an independent job with its own yt-dlp
/// process. Identical requests are not merged.
#[derive(Clone)]
pub struct MediaDownloader {
    /// Configuration (wrapped in Arc for sharing across jobs)
    pub(crate) config: Arc<Config>,
    /// Resolved executable locations, read-only after construction
    pub(crate) tools: Arc<ToolPaths>,
    /// Starts and supervises the external processes (trait object for tests)
    pub(crate) supervisor: Arc<dyn ProcessSupervisor>,
    /// Running jobs
    pub(crate) jobs: JobRegistry,
}

impl MediaDownloader {
    /// Create a downloader that runs real yt-dlp processes
    ///
    /// Tool paths come from the process-wide cache, which is filled from
    /// `config.tools` the first time any downloader is created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration fails validation.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let tools = ToolPaths::global(&config.tools).clone();
        Ok(Self::with_supervisor(config, tools, Arc::new(CliSupervisor)))
    }

    /// Create a downloader with explicit tool paths and process supervisor
    pub fn with_supervisor(
        config: Config,
        tools: ToolPaths,
        supervisor: Arc<dyn ProcessSupervisor>,
    ) -> Self {
        tracing::info!(
            supervisor = supervisor.name(),
            ytdlp = %tools.ytdlp_program().display(),
            ffmpeg = ?tools.ffmpeg,
            "Media downloader initialized"
        );

        Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            supervisor,
            jobs: JobRegistry::new(),
        }
    }

    /// Submit a request and return immediately
    ///
    /// `progress` receives every progress event of this job, in output order, and
    /// nothing once the job has observed a cancel request. The job runs in the background; the
    /// returned handle is used to cancel it or wait for its outcome. Dropping the
    /// handle does not stop the job.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if the source URL is empty or starts with `-`
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun
    ///
    /// Everything that goes wrong after submission (bad quality token, missing
    /// binary, non-zero exit) is reported through the job's [`JobOutcome`].
    pub async fn submit<S>(&self, request: DownloadRequest, progress: S) -> Result<JobHandle>
    where
        S: ProgressSink,
    {
        if !self.jobs.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let source_url = request.source_url.trim();
        if source_url.is_empty() {
            return Err(Error::InvalidRequest(
                "source URL must not be empty".to_string(),
            ));
        }

        // yt-dlp would parse a leading dash as an option, not a URL
        if source_url.starts_with('-') {
            return Err(Error::InvalidRequest(format!(
                "source URL must not start with '-': {source_url}"
            )));
        }

        let id = JobId(self.jobs.last_id.fetch_add(1, Ordering::SeqCst) + 1);
        let cancel_token = CancellationToken::new();
        let (state_tx, state_rx) = tokio::sync::watch::channel(JobState::Idle);

        // Registered before the task starts so the task's own removal cannot race ahead
        self.jobs
            .active_jobs
            .lock()
            .await
            .insert(id, cancel_token.clone());

        tracing::info!(
            job_id = %id,
            url = %request.source_url,
            format = %request.format,
            quality = %request.quality,
            "Job submitted"
        );

        let job = job::DownloadJob {
            id,
            request,
            progress,
            cancel_token: cancel_token.clone(),
            state: state_tx,
            config: Arc::clone(&self.config),
            tools: Arc::clone(&self.tools),
            supervisor: Arc::clone(&self.supervisor),
        };

        let active_jobs = Arc::clone(&self.jobs.active_jobs);
        let task = tokio::spawn(async move {
            let outcome = job.run().await;
            active_jobs.lock().await.remove(&id);
            outcome
        });

        Ok(JobHandle::new(id, cancel_token, state_rx, task))
    }

    /// Submit a request and wait for its outcome
    pub async fn download<S>(&self, request: DownloadRequest, progress: S) -> Result<JobOutcome>
    where
        S: ProgressSink,
    {
        let handle = self.submit(request, progress).await?;
        Ok(handle.wait().await)
    }

    /// Folder to suggest when the user has not picked one
    pub fn default_output_dir(&self) -> PathBuf {
        self.config.default_output_dir().clone()
    }

    /// Executable locations used by this downloader
    pub fn tool_paths(&self) -> &ToolPaths {
        &self.tools
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }
}
