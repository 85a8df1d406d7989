//! Shared test helpers: a scripted process supervisor and downloader constructors.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::error::Error;
use crate::supervisor::{
    ExitFuture, ProcessCommand, ProcessExit, ProcessHandle, ProcessSupervisor, SupervisedProcess,
};
use crate::tools::ToolPaths;
use crate::types::ProgressEvent;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// One scripted action of a fake process
#[derive(Clone)]
pub(crate) enum Step {
    /// Write a line to stdout
    Stdout(String),
    /// Write a line to stderr
    Stderr(String),
    /// Block until the gate is opened
    Gate(Arc<Notify>),
}

pub(crate) fn out(line: &str) -> Step {
    Step::Stdout(line.to_string())
}

pub(crate) fn err(line: &str) -> Step {
    Step::Stderr(line.to_string())
}

/// Supervisor that plays back a script instead of running a program
///
/// Records every command it is asked to start. When killed, it writes
/// `after_kill` to stdout (which a cancelled job must ignore) and reports
/// termination by SIGKILL.
#[derive(Clone)]
pub(crate) struct StubSupervisor {
    steps: Vec<Step>,
    exit: ProcessExit,
    after_kill: Vec<String>,
    spawn_error: Option<String>,
    started: Arc<Mutex<Vec<ProcessCommand>>>,
}

impl StubSupervisor {
    pub(crate) fn new(steps: Vec<Step>, exit: ProcessExit) -> Self {
        Self {
            steps,
            exit,
            after_kill: Vec::new(),
            spawn_error: None,
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fails every start with the given reason
    pub(crate) fn failing(reason: &str) -> Self {
        let mut stub = Self::new(Vec::new(), ProcessExit::Success);
        stub.spawn_error = Some(reason.to_string());
        stub
    }

    pub(crate) fn with_after_kill(mut self, lines: &[&str]) -> Self {
        self.after_kill = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Commands received so far
    pub(crate) fn started(&self) -> Vec<ProcessCommand> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessSupervisor for StubSupervisor {
    async fn start(&self, command: &ProcessCommand) -> crate::Result<SupervisedProcess> {
        self.started.lock().unwrap().push(command.clone());

        if let Some(reason) = &self.spawn_error {
            return Err(Error::Spawn {
                executable: command.program.clone(),
                reason: reason.clone(),
            });
        }

        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let kill = CancellationToken::new();
        let killed = kill.clone();

        let steps = self.steps.clone();
        let after_kill = self.after_kill.clone();
        let exit = self.exit;

        tokio::spawn(async move {
            for step in steps {
                let proceed = async {
                    match step {
                        Step::Stdout(line) => {
                            stdout_tx.send(line).ok();
                        }
                        Step::Stderr(line) => {
                            stderr_tx.send(line).ok();
                        }
                        Step::Gate(gate) => gate.notified().await,
                    }
                };

                tokio::select! {
                    biased;
                    _ = killed.cancelled() => {
                        for line in &after_kill {
                            stdout_tx.send(line.clone()).ok();
                        }
                        exit_tx.send(ProcessExit::Terminated { signal: Some(9) }).ok();
                        return;
                    }
                    _ = proceed => {}
                }
            }

            drop(stdout_tx);
            drop(stderr_tx);
            exit_tx.send(exit).ok();
        });

        let exit: ExitFuture = Box::pin(async move {
            exit_rx
                .await
                .unwrap_or(ProcessExit::Terminated { signal: None })
        });

        Ok(SupervisedProcess {
            handle: ProcessHandle::new(None, kill),
            stdout: UnboundedReceiverStream::new(stdout_rx).boxed(),
            stderr: UnboundedReceiverStream::new(stderr_rx).boxed(),
            exit,
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Progress sink that forwards events to a channel, plus the receiving end
pub(crate) fn progress_channel() -> (
    impl FnMut(ProgressEvent) + Send + 'static,
    mpsc::UnboundedReceiver<ProgressEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = move |event: ProgressEvent| {
        tx.send(event).ok();
    };
    (sink, rx)
}

/// Drain whatever events are already queued
pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<f64> {
    let mut percents = Vec::new();
    while let Ok(event) = rx.try_recv() {
        percents.push(event.percent);
    }
    percents
}

/// Helper to create a test MediaDownloader backed by a stub supervisor.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    stub: StubSupervisor,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.default_output_dir = temp_dir.path().join("downloads");
    config.download.shutdown_timeout = std::time::Duration::from_secs(5);
    config.tools.search_path = false;

    let downloader = MediaDownloader::with_supervisor(config, ToolPaths::default(), Arc::new(stub));
    (downloader, temp_dir)
}
