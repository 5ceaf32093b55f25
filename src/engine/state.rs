// src/engine/state.rs

//! Pure per-command state machine.
//!
//! [`RunState::step`] consumes one [`UnitInput`] and returns the events to
//! emit plus whether a new run must be launched. It owns no channels and
//! performs no IO, so it can be tested without Tokio or processes.
//!
//! Every launched run is one call to the command's single `ProcessRunner`,
//! which numbers its runs 1, 2, 3, ... in spawn order. So the id of the most
//! recently requested run is simply the number of runs requested so far.
//! Messages of any other run belong to a superseded run; they are relayed
//! but never touch the state.

use crate::engine::Event;
use crate::exec::{RunnerMessage, RunnerMessageKind};
use crate::types::{RunId, RunStatus};
use crate::watch::WatchSignal;

/// Input to [`RunState::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitInput {
    /// A message from the command's runner.
    Runner(RunnerMessage),
    /// A signal from the command's watcher.
    Watch(WatchSignal),
    /// Start a new run without a file change (startup, manual restart).
    Restart,
    /// An explicit stop has been carried out.
    Stopped { error: Option<String> },
}

/// What the async shell has to do after a step.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnitStep {
    pub events: Vec<Event>,
    /// Launch `ProcessRunner::start` in a new task.
    pub start_run: bool,
}

/// Cached view of one command's current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    name: String,
    status: RunStatus,
    log: Vec<String>,
    /// Id of the most recently requested run.
    requested: RunId,
    /// Id of the current run once the runner has reported on it.
    run: Option<RunId>,
    pid: Option<u32>,
}

impl RunState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: RunStatus::Idle,
            log: Vec::new(),
            requested: 0,
            run: None,
            pid: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Output lines of the current run, in arrival order.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn current_run(&self) -> Option<RunId> {
        self.run
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether a run was requested that the runner has not reported on yet.
    pub fn is_awaiting_run(&self) -> bool {
        self.requested > 0 && self.run != Some(self.requested)
    }

    pub fn step(&mut self, input: UnitInput) -> UnitStep {
        match input {
            UnitInput::Restart => self.begin_run(Vec::new()),
            UnitInput::Watch(WatchSignal::Changed(description)) => {
                let events = vec![Event::ChangeDetected {
                    command: self.name.clone(),
                    description,
                }];
                self.begin_run(events)
            }
            UnitInput::Watch(WatchSignal::Warning(message)) => UnitStep {
                events: vec![Event::WatchWarning {
                    command: self.name.clone(),
                    message,
                }],
                start_run: false,
            },
            UnitInput::Stopped { error } => UnitStep {
                events: vec![Event::RunStopped {
                    command: self.name.clone(),
                    error,
                }],
                start_run: false,
            },
            UnitInput::Runner(message) => self.on_runner_message(message),
        }
    }

    fn begin_run(&mut self, events: Vec<Event>) -> UnitStep {
        self.log.clear();
        self.status = RunStatus::Running;
        self.pid = None;
        self.requested += 1;
        UnitStep {
            events,
            start_run: true,
        }
    }

    fn on_runner_message(&mut self, message: RunnerMessage) -> UnitStep {
        let RunnerMessage { command, run, kind } = message;

        // Runs started behind our back still count as new runs.
        if run > self.requested {
            self.requested = run;
            self.log.clear();
            self.status = RunStatus::Running;
            self.pid = None;
        }
        let is_current = run == self.requested;
        if is_current {
            self.run = Some(run);
        }

        let event = match kind {
            RunnerMessageKind::Started { pid } => {
                if is_current {
                    self.pid = Some(pid);
                }
                Event::RunStarted { command, run, pid }
            }
            RunnerMessageKind::Line(text) => {
                if is_current {
                    self.log.push(text.clone());
                }
                Event::OutputLine { command, run, text }
            }
            RunnerMessageKind::Finished(result) => {
                if is_current {
                    self.pid = None;
                    self.status = if result.is_ok() {
                        RunStatus::Succeeded
                    } else {
                        RunStatus::Failed
                    };
                }
                Event::RunCompleted {
                    command,
                    run,
                    ok: result.is_ok(),
                    error: result.err(),
                }
            }
        };

        UnitStep {
            events: vec![event],
            start_run: false,
        }
    }
}
