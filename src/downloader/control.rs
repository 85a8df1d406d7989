//! Job control: cancel by id and inspect the active set.

use crate::error::{Error, Result};
use crate::types::JobId;

use super::MediaDownloader;

impl MediaDownloader {
    /// Cancel a running job
    ///
    /// The job's process is killed and its outcome becomes
    /// [`JobOutcome::Cancelled`](crate::JobOutcome::Cancelled). Once the job task
    /// observes the request it drops every further progress line, including lines
    /// the process had already written. A sink call that is running on the job
    /// task when this is called still completes. Cancelling a job twice is
    /// harmless.
    ///
    /// # Arguments
    ///
    /// * `id` - The job to cancel
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no job with this id is running, including
    /// jobs that have already terminated.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(downloader: MediaDownloader, id: JobId) -> Result<()> {
    /// downloader.cancel(id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn cancel(&self, id: JobId) -> Result<()> {
        let active_jobs = self.jobs.active_jobs.lock().await;
        let cancel_token = active_jobs.get(&id).ok_or(Error::NotFound(id))?;

        // The job removes itself from the map once its outcome is produced
        cancel_token.cancel();
        tracing::info!(job_id = %id, "Job cancellation requested");
        Ok(())
    }

    /// Ids of the jobs that have not yet terminated, in submission order
    pub async fn active_jobs(&self) -> Vec<JobId> {
        let active_jobs = self.jobs.active_jobs.lock().await;
        let mut ids: Vec<JobId> = active_jobs.keys().copied().collect();
        ids.sort_by_key(JobId::get);
        ids
    }

    /// Whether a job is still running
    pub async fn is_active(&self, id: JobId) -> bool {
        self.jobs.active_jobs.lock().await.contains_key(&id)
    }
}
