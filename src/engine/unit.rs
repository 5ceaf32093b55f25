// src/engine/unit.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::engine::Event;
use crate::engine::state::{RunState, UnitInput};
use crate::exec::{ProcessRunner, RunnerMessage, RunnerMessageKind};
use crate::types::RunId;
use crate::watch::WatchSignal;

/// Requests sent to a unit through its [`CommandHandle`](super::CommandHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Restart,
    Stop,
    Shutdown,
}

/// The async shell around one command's [`RunState`].
///
/// Owns the command's runner and is the only writer of its state. Each run
/// executes in its own task so that the unit keeps reacting to output,
/// changes and control requests while a process is alive.
pub struct CommandUnit {
    state: RunState,
    runner: Arc<ProcessRunner>,
    runner_rx: mpsc::Receiver<RunnerMessage>,
    watch_rx: mpsc::UnboundedReceiver<WatchSignal>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    events: mpsc::Sender<Event>,
    runs: JoinSet<RunId>,
}

impl fmt::Debug for CommandUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandUnit")
            .field("state", &self.state)
            .field("active_runs", &self.runs.len())
            .finish_non_exhaustive()
    }
}

impl CommandUnit {
    pub fn new(
        runner: Arc<ProcessRunner>,
        runner_rx: mpsc::Receiver<RunnerMessage>,
        watch_rx: mpsc::UnboundedReceiver<WatchSignal>,
        control_rx: mpsc::UnboundedReceiver<Control>,
        events: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            state: RunState::new(runner.spec().name.clone()),
            runner,
            runner_rx,
            watch_rx,
            control_rx,
            events,
            runs: JoinSet::new(),
        }
    }

    /// Launch the initial run, then react until shut down.
    pub async fn run(mut self) {
        info!(command = %self.state.name(), "command unit started");
        self.apply(UnitInput::Restart).await;

        let mut watch_open = true;

        loop {
            tokio::select! {
                Some(message) = self.runner_rx.recv() => {
                    self.apply(UnitInput::Runner(message)).await;
                }
                signal = self.watch_rx.recv(), if watch_open => match signal {
                    Some(signal) => self.apply(UnitInput::Watch(signal)).await,
                    None => {
                        debug!(command = %self.state.name(), "watcher gone");
                        watch_open = false;
                    }
                },
                control = self.control_rx.recv() => match control {
                    Some(Control::Restart) => self.apply(UnitInput::Restart).await,
                    Some(Control::Stop) => {
                        let error = match self.runner.stop().await {
                            Ok(()) => None,
                            Err(err) => {
                                warn!(command = %self.state.name(), error = %err, "stop failed");
                                Some(err.to_string())
                            }
                        };
                        self.apply(UnitInput::Stopped { error }).await;
                    }
                    Some(Control::Shutdown) | None => break,
                },
                Some(joined) = self.runs.join_next(), if !self.runs.is_empty() => {
                    if let Err(err) = joined {
                        warn!(command = %self.state.name(), error = %err, "run task failed");
                    }
                }
            }
        }

        self.shutdown().await;
    }

    async fn apply(&mut self, input: UnitInput) {
        let step = self.state.step(input);

        for event in step.events {
            if self.events.send(event).await.is_err() {
                debug!(command = %self.state.name(), "event receiver closed; dropping event");
            }
        }

        if step.start_run {
            let runner = Arc::clone(&self.runner);
            self.runs.spawn(async move { runner.start().await });
        }
    }

    /// Kill the current process and relay what the remaining runs report
    /// until all of them are over.
    async fn shutdown(mut self) {
        info!(command = %self.state.name(), "shutting down command");
        self.stop_runner().await;

        while !self.runs.is_empty() {
            tokio::select! {
                Some(message) = self.runner_rx.recv() => {
                    // A run launched just before shutdown may spawn after
                    // the stop above.
                    let spawned = matches!(message.kind, RunnerMessageKind::Started { .. });
                    self.apply(UnitInput::Runner(message)).await;
                    if spawned {
                        self.stop_runner().await;
                    }
                }
                Some(joined) = self.runs.join_next() => {
                    if let Err(err) = joined {
                        warn!(command = %self.state.name(), error = %err, "run task failed");
                    }
                }
                else => break,
            }
        }

        while let Ok(message) = self.runner_rx.try_recv() {
            self.apply(UnitInput::Runner(message)).await;
        }

        debug!(command = %self.state.name(), status = %self.state.status(), "command unit finished");
    }

    async fn stop_runner(&self) {
        if let Err(err) = self.runner.stop().await {
            warn!(command = %self.state.name(), error = %err, "failed to stop process");
        }
    }
}
