// src/engine/mod.rs

//! Orchestration engine for rorsch.
//!
//! This module ties together, per configured command:
//! - a [`FileWatcher`](crate::watch::FileWatcher) producing debounced
//!   change signals
//! - a [`ProcessRunner`](crate::exec::ProcessRunner) that owns the
//!   command's process
//! - a unit task that reacts to changes, runner messages and control
//!   requests, and emits [`Event`]s
//!
//! The pure per-command state machine lives in [`state`]; the async shell
//! around it is implemented in [`unit`], and [`supervisor`] starts and stops
//! one unit per command.

pub mod state;
pub mod supervisor;
pub mod unit;

use crate::errors::RunError;
use crate::types::RunId;

pub use state::{RunState, UnitInput, UnitStep};
pub use supervisor::{CommandHandle, Supervisor};

/// Everything the outside world gets to see, tagged with the command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A process was spawned for a run.
    RunStarted { command: String, run: RunId, pid: u32 },
    /// One line of output (stdout or stderr) of a run.
    OutputLine {
        command: String,
        run: RunId,
        text: String,
    },
    /// Terminal event of a run. Exactly one per run.
    RunCompleted {
        command: String,
        run: RunId,
        ok: bool,
        error: Option<RunError>,
    },
    /// A debounced file change is about to restart the command.
    ChangeDetected { command: String, description: String },
    /// A non-fatal watch problem.
    WatchWarning { command: String, message: String },
    /// Outcome of an explicit stop request.
    RunStopped {
        command: String,
        error: Option<String>,
    },
}

impl Event {
    /// Name of the command this event belongs to.
    pub fn command(&self) -> &str {
        match self {
            Event::RunStarted { command, .. }
            | Event::OutputLine { command, .. }
            | Event::RunCompleted { command, .. }
            | Event::ChangeDetected { command, .. }
            | Event::WatchWarning { command, .. }
            | Event::RunStopped { command, .. } => command,
        }
    }
}
