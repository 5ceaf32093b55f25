// src/errors.rs

//! Crate-wide error types.
//!
//! - [`RorschError`] covers setup-time failures (config, glob, watcher) and
//!   kill failures reported by the process runner.
//! - [`RunError`] describes why a single run of a command did not succeed.
//!   It travels inside events, so it is `Clone` and carries plain strings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RorschError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("cannot resolve glob '{pattern}': {message}")]
    GlobResolve { pattern: String, message: String },

    #[error("failed to set up file watching for '{command}': {source}")]
    WatchSetup {
        command: String,
        #[source]
        source: notify::Error,
    },

    #[error("failed to kill process {pid}: {message}")]
    Kill { pid: u32, message: String },
}

/// Why a run of a command ended unsuccessfully.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("command line is empty")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("{}", describe_exit(.code, .signal))]
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("failed waiting for process: {0}")]
    Wait(String),
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (code, signal) {
        (Some(code), _) => format!("exit status {code}"),
        (None, Some(signal)) => format!("terminated by signal {signal}"),
        (None, None) => "terminated abnormally".to_string(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RorschError>;
