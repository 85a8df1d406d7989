//! Supervision of a single external process
//!
//! The [`ProcessSupervisor`] trait starts one child process and hands back its
//! output as line streams together with a future for its exit. [`CliSupervisor`]
//! is the real implementation on top of `tokio::process`; tests drive the
//! downloader with scripted implementations of the same trait.
//!
//! Output is split into lines on both `\n` and `\r`, because yt-dlp redraws its
//! progress line with carriage returns when it is not writing to a terminal.
//! Bytes are decoded lossily, so a stray invalid UTF-8 sequence never ends a stream.
//!
//! On Unix the child leads its own process group and a kill signals the whole
//! group, so ffmpeg and any helper processes yt-dlp started go down with it.

use crate::error::Error;
use crate::invocation::ResolvedInvocation;
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::sync::{CancellationToken, DropGuard};

/// How long output may keep draining after a kill before the readers are dropped
const DRAIN_AFTER_KILL: Duration = Duration::from_secs(2);

/// Lines written by the child to one of its output streams, in write order
pub type OutputStream = BoxStream<'static, String>;

/// Resolves once with the way the child ended
pub type ExitFuture = BoxFuture<'static, ProcessExit>;

/// What to run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessCommand {
    /// Program path or bare name
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Working directory (inherited if None)
    pub current_dir: Option<PathBuf>,
}

impl ProcessCommand {
    /// Command for a program with arguments and an inherited environment
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
            current_dir: None,
        }
    }
}

impl From<&ResolvedInvocation> for ProcessCommand {
    fn from(invocation: &ResolvedInvocation) -> Self {
        Self::new(invocation.executable.clone(), invocation.args.clone())
    }
}

/// How a supervised process ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessExit {
    /// Exit code 0
    Success,
    /// Non-zero exit code
    Failure {
        /// The exit code
        exit_code: i32,
    },
    /// Killed rather than exiting normally
    Terminated {
        /// Signal number, where the platform reports one
        signal: Option<i32>,
    },
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        match status.code() {
            Some(0) => Self::Success,
            Some(exit_code) => Self::Failure { exit_code },
            None => Self::Terminated {
                signal: exit_signal(&status),
            },
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Owner's reference to a running child
///
/// Dropping the handle requests termination, so abandoning a job never leaves
/// the process running.
pub struct ProcessHandle {
    pid: Option<u32>,
    kill: CancellationToken,
    _kill_on_drop: DropGuard,
}

impl ProcessHandle {
    /// Wrap a kill token; cancelling the token must terminate the child
    pub fn new(pid: Option<u32>, kill: CancellationToken) -> Self {
        let guard = kill.clone().drop_guard();
        Self {
            pid,
            kill,
            _kill_on_drop: guard,
        }
    }

    /// OS process id, if known
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Request termination. The exit future still resolves afterwards.
    pub fn kill(&self) {
        self.kill.cancel();
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("killed", &self.kill.is_cancelled())
            .finish()
    }
}

/// A started process: handle, output streams and exit
pub struct SupervisedProcess {
    /// Handle used to kill the process
    pub handle: ProcessHandle,
    /// Standard output lines
    pub stdout: OutputStream,
    /// Standard error lines
    pub stderr: OutputStream,
    /// Resolves after the process ended and both streams reached end-of-file
    pub exit: ExitFuture,
}

/// Trait for starting and supervising external processes
///
/// Implementations must deliver every line of output before the exit future
/// resolves, and must not retry on failure.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Start the command
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the program cannot be started.
    async fn start(&self, command: &ProcessCommand) -> crate::Result<SupervisedProcess>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Supervisor that runs real child processes via `tokio::process`
#[derive(Clone, Copy, Debug, Default)]
pub struct CliSupervisor;

#[async_trait]
impl ProcessSupervisor for CliSupervisor {
    async fn start(&self, command: &ProcessCommand) -> crate::Result<SupervisedProcess> {
        let spawn_error = |reason: String| Error::Spawn {
            executable: command.program.clone(),
            reason,
        };

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| spawn_error(e.to_string()))?;
        let pid = child.id();

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| spawn_error("stderr was not captured".to_string()))?;

        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();
        let stdout_task = tokio::spawn(forward_lines(stdout, stdout_tx));
        let stderr_task = tokio::spawn(forward_lines(stderr, stderr_tx));

        let kill = CancellationToken::new();
        let kill_requested = kill.clone();
        let (exit_tx, exit_rx) = oneshot::channel();
        let program = command.program.clone();

        tokio::spawn(async move {
            let mut stdout_task = stdout_task;
            let mut stderr_task = stderr_task;

            let (status, killed) = tokio::select! {
                status = child.wait() => (status, false),
                _ = kill_requested.cancelled() => {
                    tracing::debug!(pid = ?pid, "Killing child process group");
                    if let Err(e) = kill_process_tree(&mut child, pid) {
                        tracing::warn!(pid = ?pid, error = %e, "Failed to kill child process");
                    }
                    (child.wait().await, true)
                }
            };

            // Exit is reported only after all output has been forwarded. After a
            // kill, a descendant that escaped the group may still hold the pipes.
            let drained = async {
                (&mut stdout_task).await.ok();
                (&mut stderr_task).await.ok();
            };
            if killed {
                if tokio::time::timeout(DRAIN_AFTER_KILL, drained).await.is_err() {
                    tracing::warn!(pid = ?pid, "Output still open after kill, dropping readers");
                    stdout_task.abort();
                    stderr_task.abort();
                }
            } else {
                drained.await;
            }

            let exit = match status {
                Ok(status) => ProcessExit::from(status),
                Err(e) => {
                    tracing::warn!(program = ?program, error = %e, "Failed to wait for child process");
                    ProcessExit::Terminated { signal: None }
                }
            };
            exit_tx.send(exit).ok();
        });

        let exit: ExitFuture = Box::pin(async move {
            exit_rx
                .await
                .unwrap_or(ProcessExit::Terminated { signal: None })
        });

        Ok(SupervisedProcess {
            handle: ProcessHandle::new(pid, kill),
            stdout: UnboundedReceiverStream::new(stdout_rx).boxed(),
            stderr: UnboundedReceiverStream::new(stderr_rx).boxed(),
            exit,
        })
    }

    fn name(&self) -> &'static str {
        "cli"
    }
}

/// Kill the child together with everything in its process group
#[cfg(unix)]
fn kill_process_tree(child: &mut Child, pid: Option<u32>) -> std::io::Result<()> {
    if let Some(pgid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) {
        // SAFETY: kill(2) takes plain integers and touches no memory. The child
        // was spawned with process_group(0), so its pid is the group id and the
        // negated value addresses only that group. It has not been reaped yet, so
        // the id cannot have been reused.
        if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
            return Ok(());
        }
        tracing::debug!(
            pgid,
            error = %std::io::Error::last_os_error(),
            "Process group kill failed, killing child only"
        );
    }
    child.start_kill()
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child, _pid: Option<u32>) -> std::io::Result<()> {
    child.start_kill()
}

/// Read lines until end-of-file. Keeps draining after the receiver is gone so a
/// chatty child never blocks on a full pipe.
async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, OutputLineCodec);
    while let Some(item) = lines.next().await {
        match item {
            Ok(line) => {
                tx.send(line).ok();
            }
            Err(e) => {
                tracing::debug!(error = %e, "Output stream read failed");
                break;
            }
        }
    }
}

/// Splits process output on `\n` and `\r`, skipping empty segments
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputLineCodec;

impl Decoder for OutputLineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        while let Some(pos) = buf.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let line = buf.split_to(pos);
            buf.advance(1);
            if !line.is_empty() {
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split();
        Ok(Some(String::from_utf8_lossy(&rest).into_owned()))
    }
}
