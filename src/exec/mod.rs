// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the configured commands,
//! using `tokio::process::Command`, and reporting their output and lifecycle
//! back as [`RunnerMessage`]s.
//!
//! - [`runner`] owns the per-command [`ProcessRunner`] (spawn, stream, wait,
//!   kill-and-replace).
//! - [`command_line`] splits an `exec` string into program + arguments.
//! - [`kill`] terminates a process together with its process group.

pub mod command_line;
pub mod kill;
pub mod runner;

pub use command_line::CommandLine;
pub use kill::terminate_tree;
pub use runner::{ProcessRunner, RunnerMessage, RunnerMessageKind};
