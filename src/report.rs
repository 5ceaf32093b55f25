// src/report.rs

//! Line-oriented console consumer of the event stream.
//!
//! [`format_event`] turns each [`Event`] into one printable line, and
//! [`StatusBoard`] keeps its own per-command view of the latest run for the
//! summary printed at exit.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::io::Write;

use tokio::sync::mpsc;

use crate::engine::Event;
use crate::types::{RunId, RunStatus};

/// Number of output lines kept per command.
pub const DEFAULT_TAIL_LEN: usize = 20;

pub fn format_event(event: &Event) -> String {
    let name = event.command();
    match event {
        Event::OutputLine { text, .. } => format!("[{name}] {text}"),
        Event::RunStarted { pid, .. } => format!("[{name}] ▶ started (pid {pid})"),
        Event::RunCompleted { ok: true, .. } => format!("[{name}] ✔ ok"),
        Event::RunCompleted { error: Some(err), .. } => format!("[{name}] ✘ failed: {err}"),
        Event::RunCompleted { .. } => format!("[{name}] ✘ failed"),
        Event::ChangeDetected { description, .. } => format!("[{name}] ↻ {description}"),
        Event::WatchWarning { message, .. } => format!("[{name}] ! {message}"),
        Event::RunStopped { error: None, .. } => format!("[{name}] ■ stopped"),
        Event::RunStopped { error: Some(err), .. } => format!("[{name}] ! stop failed: {err}"),
    }
}

/// What the board knows about one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandStatus {
    pub status: RunStatus,
    pub run: Option<RunId>,
    pub pid: Option<u32>,
    /// Last lines of the current run's output.
    pub tail: VecDeque<String>,
    pub last_error: Option<String>,
    /// Number of debounced changes seen.
    pub changes: u64,
    /// False between a change and the first event of the run it causes.
    accepting: bool,
}

impl CommandStatus {
    fn reset_run(&mut self) {
        self.tail.clear();
        self.last_error = None;
        self.pid = None;
        self.status = RunStatus::Running;
    }
}

#[derive(Debug, Clone)]
pub struct StatusBoard {
    order: Vec<String>,
    commands: HashMap<String, CommandStatus>,
    tail_len: usize,
}

impl StatusBoard {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_tail_len(names, DEFAULT_TAIL_LEN)
    }

    pub fn with_tail_len<I, S>(names: I, tail_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = names.into_iter().map(Into::into).collect();
        let commands = order
            .iter()
            .map(|name| (name.clone(), CommandStatus::default()))
            .collect();
        Self {
            order,
            commands,
            tail_len,
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandStatus> {
        self.commands.get(name)
    }

    pub fn apply(&mut self, event: &Event) {
        let name = event.command();
        if !self.commands.contains_key(name) {
            self.order.push(name.to_string());
        }
        let tail_len = self.tail_len;
        let entry = self.commands.entry(name.to_string()).or_default();

        match event {
            Event::ChangeDetected { .. } => {
                entry.changes += 1;
                entry.reset_run();
                entry.accepting = false;
            }
            Event::RunStarted { run, pid, .. } => {
                if adopt(entry, *run) {
                    entry.pid = Some(*pid);
                }
            }
            Event::OutputLine { run, text, .. } => {
                if entry.accepting && entry.run == Some(*run) {
                    if entry.tail.len() == tail_len {
                        entry.tail.pop_front();
                    }
                    if tail_len > 0 {
                        entry.tail.push_back(text.clone());
                    }
                }
            }
            Event::RunCompleted { run, ok, error, .. } => {
                if adopt(entry, *run) {
                    entry.pid = None;
                    if *ok {
                        entry.status = RunStatus::Succeeded;
                    } else {
                        entry.status = RunStatus::Failed;
                        entry.last_error = Some(
                            error
                                .as_ref()
                                .map(ToString::to_string)
                                .unwrap_or_else(|| "failed".to_string()),
                        );
                    }
                }
            }
            Event::WatchWarning { .. } | Event::RunStopped { .. } => {}
        }
    }

    /// Plain-text table, one row per command in configuration order.
    pub fn render_summary(&self) -> String {
        let width = self
            .order
            .iter()
            .map(String::len)
            .chain(std::iter::once("COMMAND".len()))
            .max()
            .unwrap_or_default();

        let mut out = String::new();
        let _ = writeln!(out, "{:<width$}  {:<8}  {:>4}  DETAIL", "COMMAND", "STATUS", "RUN");

        for name in &self.order {
            let Some(cmd) = self.commands.get(name) else {
                continue;
            };
            let run = cmd.run.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
            let detail = cmd
                .last_error
                .clone()
                .or_else(|| cmd.tail.back().cloned())
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{:<width$}  {:<8}  {:>4}  {}",
                name,
                cmd.status.to_string(),
                run,
                detail
            );
        }

        out
    }
}

/// Whether `run` is the current run, switching to it if it is newer.
fn adopt(entry: &mut CommandStatus, run: RunId) -> bool {
    match entry.run {
        Some(current) if run < current => false,
        Some(current) if run == current => entry.accepting,
        _ => {
            entry.run = Some(run);
            entry.reset_run();
            entry.accepting = true;
            true
        }
    }
}

/// Print every event to `out` and keep `board` up to date until the
/// stream ends.
pub async fn print_events<W: Write>(
    mut events: mpsc::Receiver<Event>,
    board: &mut StatusBoard,
    out: &mut W,
) -> std::io::Result<()> {
    while let Some(event) = events.recv().await {
        board.apply(&event);
        writeln!(out, "{}", format_event(&event))?;
        out.flush()?;
    }
    Ok(())
}
