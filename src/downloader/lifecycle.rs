//! Shutdown coordination.

use std::sync::atomic::Ordering;

use super::MediaDownloader;

impl MediaDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs the shutdown sequence:
    /// 1. Stops accepting new jobs ([`submit`](Self::submit) returns
    ///    [`Error::ShuttingDown`](crate::Error::ShuttingDown) from now on)
    /// 2. Cancels all running jobs, which kills their processes
    /// 3. Waits for the jobs to terminate, up to `download.shutdown_timeout`
    ///
    /// Every clone of the downloader shares the same job set, so shutting down
    /// one clone shuts down all of them.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");

        self.jobs.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        self.cancel_all().await;

        let shutdown_timeout = self.config.download.shutdown_timeout;
        match tokio::time::timeout(shutdown_timeout, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All jobs terminated"),
            Err(_) => {
                let remaining = self.jobs.active_jobs.lock().await.len();
                tracing::warn!(
                    remaining,
                    timeout_secs = shutdown_timeout.as_secs_f64(),
                    "Timeout waiting for jobs to terminate, proceeding with shutdown"
                );
            }
        }

        tracing::info!("Graceful shutdown complete");
    }

    /// Whether new jobs are still accepted
    pub fn is_accepting_jobs(&self) -> bool {
        self.jobs.accepting_new.load(Ordering::SeqCst)
    }

    /// Signal cancellation to every running job
    pub(crate) async fn cancel_all(&self) {
        let active = self.jobs.active_jobs.lock().await;
        tracing::debug!(active_count = active.len(), "Cancelling all active jobs");

        for (id, token) in active.iter() {
            tracing::debug!(job_id = %id, "Signaling cancellation");
            token.cancel();
        }
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.jobs.active_jobs.lock().await.len();

            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for active jobs to terminate");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
