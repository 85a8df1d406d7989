//! Per-job state machine
//!
//! A job moves `Idle -> Planning -> Spawning -> Running -> Terminated`, leaving
//! early for `Terminated` when planning fails, the spawn fails or the job is
//! cancelled. Exactly one [`JobOutcome`] is produced per job.

use crate::config::Config;
use crate::invocation::ResolvedInvocation;
use crate::planner::plan;
use crate::progress::parse_line;
use crate::supervisor::{ProcessCommand, ProcessExit, ProcessSupervisor, SupervisedProcess};
use crate::tools::ToolPaths;
use crate::types::{DownloadRequest, JobId, JobOutcome, JobState, ProgressEvent};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Receiver for a job's progress events
///
/// Called from the job's task, in the order the lines were written. Implemented
/// for any `FnMut(ProgressEvent) + Send + 'static` closure.
pub trait ProgressSink: Send + 'static {
    /// Deliver one event
    fn on_progress(&mut self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressEvent) + Send + 'static,
{
    fn on_progress(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Caller's reference to a submitted job
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    cancel_token: CancellationToken,
    state: watch::Receiver<JobState>,
    task: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub(crate) fn new(
        id: JobId,
        cancel_token: CancellationToken,
        state: watch::Receiver<JobState>,
        task: JoinHandle<JobOutcome>,
    ) -> Self {
        Self {
            id,
            cancel_token,
            state,
            task,
        }
    }

    /// Job identifier
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change
    pub fn subscribe_state(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    /// Request cancellation
    ///
    /// Idempotent. Has no effect once the job has terminated; its outcome is
    /// already fixed. See [`MediaDownloader::cancel`](crate::MediaDownloader::cancel)
    /// for which progress events can still arrive.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Whether the job has produced its outcome
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job's outcome
    pub async fn wait(self) -> JobOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(job_id = %self.id, error = %e, "Job task failed");
                JobOutcome::Failure {
                    exit_code: -1,
                    message: format!("job task failed: {e}"),
                    diagnostics: Vec::new(),
                }
            }
        }
    }
}

/// Everything a running job owns
pub(crate) struct DownloadJob<S> {
    pub(crate) id: JobId,
    pub(crate) request: DownloadRequest,
    pub(crate) progress: S,
    pub(crate) cancel_token: CancellationToken,
    pub(crate) state: watch::Sender<JobState>,
    pub(crate) config: Arc<Config>,
    pub(crate) tools: Arc<ToolPaths>,
    pub(crate) supervisor: Arc<dyn ProcessSupervisor>,
}

impl<S: ProgressSink> DownloadJob<S> {
    /// Drive the job to its outcome
    pub(crate) async fn run(mut self) -> JobOutcome {
        let outcome = self.execute().await;
        self.transition(JobState::Terminated);

        match &outcome {
            JobOutcome::Success { output_folder } => {
                tracing::info!(job_id = %self.id, output_folder = %output_folder.display(), "Download complete");
            }
            JobOutcome::Cancelled => {
                tracing::info!(job_id = %self.id, "Download cancelled");
            }
            other => {
                tracing::warn!(
                    job_id = %self.id,
                    outcome = ?other,
                    "Download did not succeed"
                );
            }
        }

        outcome
    }

    async fn execute(&mut self) -> JobOutcome {
        if self.cancel_token.is_cancelled() {
            return JobOutcome::Cancelled;
        }

        self.transition(JobState::Planning);
        let flags = match plan(self.request.format, &self.request.quality) {
            Ok(flags) => flags,
            Err(e) => {
                return JobOutcome::PlanningFailed {
                    message: e.to_string(),
                };
            }
        };

        self.transition(JobState::Spawning);
        let invocation = ResolvedInvocation::build(
            &self.request,
            &flags,
            &self.tools,
            &self.config.download.filename_template,
        );
        tracing::debug!(
            job_id = %self.id,
            executable = %invocation.executable.display(),
            args = ?invocation.args,
            "Starting yt-dlp"
        );

        let command = ProcessCommand::from(&invocation);
        let started = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return JobOutcome::Cancelled,
            started = self.supervisor.start(&command) => started,
        };

        let process = match started {
            Ok(process) => process,
            Err(e) => {
                return JobOutcome::SpawnError {
                    message: e.to_string(),
                };
            }
        };

        // The start future may have won a tie with a cancel request
        if self.cancel_token.is_cancelled() {
            process.handle.kill();
            process.exit.await;
            return JobOutcome::Cancelled;
        }

        self.transition(JobState::Running);
        self.supervise(process).await
    }

    async fn supervise(&mut self, process: SupervisedProcess) -> JobOutcome {
        let SupervisedProcess {
            handle,
            mut stdout,
            mut stderr,
            mut exit,
        } = process;

        tracing::debug!(job_id = %self.id, pid = ?handle.pid(), "yt-dlp running");

        let max_lines = self.config.download.max_diagnostic_lines;
        let mut diagnostics: VecDeque<String> = VecDeque::with_capacity(max_lines);
        let mut stdout_open = true;
        let mut stderr_open = true;

        let status = loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    handle.kill();
                    let status = exit.await;
                    tracing::debug!(job_id = %self.id, status = ?status, "yt-dlp stopped after cancel");
                    return JobOutcome::Cancelled;
                }

                line = stdout.next(), if stdout_open => match line {
                    Some(line) => self.handle_stdout(&line),
                    None => stdout_open = false,
                },

                line = stderr.next(), if stderr_open => match line {
                    Some(line) => {
                        tracing::warn!(target: "media_dl::diagnostics", job_id = %self.id, line = %line, "yt-dlp stderr");
                        if max_lines > 0 {
                            if diagnostics.len() == max_lines {
                                diagnostics.pop_front();
                            }
                            diagnostics.push_back(line);
                        }
                    }
                    None => stderr_open = false,
                },

                status = &mut exit, if !stdout_open && !stderr_open => break status,
            }
        };

        match status {
            ProcessExit::Success => JobOutcome::Success {
                output_folder: self.request.output_folder.clone(),
            },
            ProcessExit::Failure { exit_code } => JobOutcome::Failure {
                exit_code,
                message: format!("Process exited with code {exit_code}"),
                diagnostics: diagnostics.into(),
            },
            ProcessExit::Terminated { signal } => {
                let (exit_code, message) = match signal {
                    Some(signal) => (
                        128 + signal,
                        format!("Process terminated by signal {signal}"),
                    ),
                    None => (-1, "Process terminated".to_string()),
                };
                JobOutcome::Failure {
                    exit_code,
                    message,
                    diagnostics: diagnostics.into(),
                }
            }
        }
    }

    fn handle_stdout(&mut self, line: &str) {
        tracing::trace!(job_id = %self.id, line = %line, "yt-dlp output");

        let Some(event) = parse_line(line) else {
            return;
        };

        if self.cancel_token.is_cancelled() {
            return;
        }

        self.progress.on_progress(event);
    }

    fn transition(&self, state: JobState) {
        tracing::debug!(job_id = %self.id, state = ?state, "Job state changed");
        self.state.send_replace(state);
    }
}
