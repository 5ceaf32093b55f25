// src/exec/runner.rs

//! Spawning, streaming and killing of one command's processes.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Split};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::errors::{Result, RunError};
use crate::exec::command_line::CommandLine;
use crate::exec::kill::terminate_tree;
use crate::types::{CommandSpec, RunId};

/// How long to keep reading output after the process exited.
///
/// A descendant that escaped the process group can hold the pipes open
/// indefinitely; after this grace period its remaining output is dropped.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Message emitted by a [`ProcessRunner`] for one of its runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerMessage {
    pub command: String,
    pub run: RunId,
    pub kind: RunnerMessageKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerMessageKind {
    /// The process was spawned.
    Started { pid: u32 },
    /// One complete line from stdout or stderr.
    Line(String),
    /// The run is over. Sent exactly once per run.
    Finished(std::result::Result<(), RunError>),
}

struct TrackedProcess {
    run: RunId,
    pid: u32,
    cancel: Option<oneshot::Sender<()>>,
}

/// Runs one command, at most one process at a time.
///
/// Every [`start`](Self::start) first kills whatever the previous start left
/// running. Inspection, killing and replacement of the tracked process all
/// happen under one lock, so concurrent starts, stops and natural exits never
/// act on a stale process.
pub struct ProcessRunner {
    spec: Arc<CommandSpec>,
    sink: mpsc::Sender<RunnerMessage>,
    tracked: Mutex<Option<TrackedProcess>>,
    last_run: AtomicU64,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("command", &self.spec.name)
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    pub fn new(spec: Arc<CommandSpec>, sink: mpsc::Sender<RunnerMessage>) -> Self {
        Self {
            spec,
            sink,
            tracked: Mutex::new(None),
            last_run: AtomicU64::new(0),
        }
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Pid of the process currently tracked, if any.
    pub async fn current_pid(&self) -> Option<u32> {
        self.tracked.lock().await.as_ref().map(|p| p.pid)
    }

    /// Stop the previous process, spawn a new one and follow it until it
    /// exits (or is killed by a later `start`/`stop`).
    ///
    /// Returns the id assigned to this run.
    pub async fn start(&self) -> RunId {
        let name = self.spec.name.as_str();

        let (run, spawned) = {
            let mut tracked = self.tracked.lock().await;
            // Numbered under the lock so that a higher id always means a
            // later spawn.
            let run = self.last_run.fetch_add(1, Ordering::SeqCst) + 1;

            if let Err(err) = stop_tracked(name, &mut tracked) {
                warn!(
                    command = %name,
                    run,
                    error = %err,
                    "failed to kill previous process; starting new one anyway"
                );
            }

            let spawned = self.spawn().map(|child| {
                let pid = child.id().unwrap_or_default();
                let (cancel_tx, cancel_rx) = oneshot::channel();
                *tracked = Some(TrackedProcess {
                    run,
                    pid,
                    cancel: Some(cancel_tx),
                });
                (child, pid, cancel_rx)
            });
            (run, spawned)
        };

        let (child, pid, cancel_rx) = match spawned {
            Ok(spawned) => spawned,
            Err(err) => {
                warn!(command = %name, run, error = %err, "failed to start command");
                self.send(run, RunnerMessageKind::Finished(Err(err))).await;
                return run;
            }
        };

        info!(command = %name, run, pid, cmd = %self.spec.exec, "starting command");
        self.send(run, RunnerMessageKind::Started { pid }).await;

        let outcome = self.follow(run, child, cancel_rx).await;

        {
            let mut tracked = self.tracked.lock().await;
            if tracked.as_ref().is_some_and(|p| p.run == run) {
                *tracked = None;
            }
        }

        match &outcome {
            Ok(()) => info!(command = %name, run, pid, "command finished"),
            Err(err) => info!(command = %name, run, pid, error = %err, "command failed"),
        }

        self.send(run, RunnerMessageKind::Finished(outcome)).await;
        run
    }

    /// Kill the tracked process and all of its descendants.
    ///
    /// No-op when nothing is running.
    pub async fn stop(&self) -> Result<()> {
        let mut tracked = self.tracked.lock().await;
        stop_tracked(&self.spec.name, &mut tracked)
    }

    fn spawn(&self) -> std::result::Result<Child, RunError> {
        let line = CommandLine::parse(&self.spec.exec).ok_or(RunError::EmptyCommand)?;

        let mut cmd = Command::new(&line.program);
        cmd.args(&line.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &self.spec.cwd {
            cmd.current_dir(cwd);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn().map_err(|err| RunError::Spawn {
            program: line.program.clone(),
            message: err.to_string(),
        })
    }

    /// Stream output and wait for exit. Output is fully drained (or
    /// abandoned after [`DRAIN_GRACE`]) before this returns.
    async fn follow(
        &self,
        run: RunId,
        mut child: Child,
        mut cancel_rx: oneshot::Receiver<()>,
    ) -> std::result::Result<(), RunError> {
        let mut drain = tokio::spawn(drain_output(
            self.spec.name.clone(),
            run,
            child.stdout.take(),
            child.stderr.take(),
            self.sink.clone(),
        ));

        let status = tokio::select! {
            status = child.wait() => status,
            _ = &mut cancel_rx => {
                // Either an explicit stop or the handle was dropped by a
                // newer start; both mean this process has to go.
                let _ = child.start_kill();
                child.wait().await
            }
        };

        if tokio::time::timeout(DRAIN_GRACE, &mut drain).await.is_err() {
            drain.abort();
            debug!(
                command = %self.spec.name,
                run,
                "output pipes still open after exit; dropping remaining output"
            );
        }

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(RunError::Exited {
                code: status.code(),
                signal: exit_signal(&status),
            }),
            Err(err) => Err(RunError::Wait(err.to_string())),
        }
    }

    async fn send(&self, run: RunId, kind: RunnerMessageKind) {
        let message = RunnerMessage {
            command: self.spec.name.clone(),
            run,
            kind,
        };
        if self.sink.send(message).await.is_err() {
            debug!(command = %self.spec.name, run, "runner sink closed; dropping message");
        }
    }
}

fn stop_tracked(command: &str, tracked: &mut Option<TrackedProcess>) -> Result<()> {
    let Some(mut process) = tracked.take() else {
        return Ok(());
    };

    debug!(command, run = process.run, pid = process.pid, "killing process");
    let result = terminate_tree(process.pid);

    if let Some(cancel) = process.cancel.take() {
        let _ = cancel.send(());
    }

    result
}

/// Read stdout and stderr concurrently, forwarding each complete line.
async fn drain_output(
    command: String,
    run: RunId,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    sink: mpsc::Sender<RunnerMessage>,
) {
    let mut out = stdout.map(|s| BufReader::new(s).split(b'\n'));
    let mut err = stderr.map(|s| BufReader::new(s).split(b'\n'));

    loop {
        let line = tokio::select! {
            line = next_line(&mut out), if out.is_some() => match line {
                Some(line) => line,
                None => {
                    out = None;
                    continue;
                }
            },
            line = next_line(&mut err), if err.is_some() => match line {
                Some(line) => line,
                None => {
                    err = None;
                    continue;
                }
            },
            else => break,
        };

        let message = RunnerMessage {
            command: command.clone(),
            run,
            kind: RunnerMessageKind::Line(line),
        };
        if sink.send(message).await.is_err() {
            break;
        }
    }
}

async fn next_line<R>(lines: &mut Option<Split<R>>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    let lines = lines.as_mut()?;
    match lines.next_segment().await {
        Ok(Some(mut bytes)) => {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        Ok(None) | Err(_) => None,
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
