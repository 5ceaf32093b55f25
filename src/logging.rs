// src/logging.rs

//! Logging setup for `rorsch` using `tracing` + `tracing-subscriber`.
//!
//! The filter is taken from, in order:
//! 1. the `--log-level` CLI flag,
//! 2. the `RORSCH_LOG` environment variable, which accepts full
//!    `EnvFilter` directives (`debug`, `rorsch::exec=trace,warn`, ...),
//! 3. `warn`.
//!
//! Logs go to stderr; stdout belongs to the commands' output.

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "RORSCH_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => level_filter(level_from_log_level(level)),
        None => env_filter(std::env::var(LOG_ENV_VAR).ok().as_deref()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install logger: {err}"))
}

/// Filter for a `RORSCH_LOG` value; unset or unparsable means `warn`.
pub fn env_filter(value: Option<&str>) -> EnvFilter {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| level_filter(Level::WARN))
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
}

pub fn level_from_log_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}
