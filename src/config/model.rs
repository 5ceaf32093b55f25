// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::CommandSpec;
use crate::watch::WatchOptions;

/// Configuration exactly as read from a TOML file, before validation.
///
/// ```toml
/// [settings]
/// debounce_ms = 200
/// cooldown_ms = 3000
/// rescan_secs = 10
///
/// [[command]]
/// name = "build"
/// exec = "go build ./..."
/// glob = "src/**/*.go"
/// cwd = "."
/// ```
///
/// `[settings]` is optional; `[[command]]` may repeat.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub settings: SettingsSection,

    #[serde(default)]
    pub command: Vec<CommandConfig>,
}

/// `[settings]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SettingsSection {
    /// Quiet period after the last change before restarting.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Minimum time between two accepted restarts of one command.
    /// `0` disables the cooldown.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// How often globs are re-resolved to pick up new directories.
    #[serde(default = "default_rescan_secs")]
    pub rescan_secs: u64,
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_cooldown_ms() -> u64 {
    3000
}

fn default_rescan_secs() -> u64 {
    10
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            cooldown_ms: default_cooldown_ms(),
            rescan_secs: default_rescan_secs(),
        }
    }
}

/// One `[[command]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub name: String,

    /// Executable and arguments, whitespace separated. No shell is involved.
    pub exec: String,

    pub glob: String,

    /// Working directory; inherits ours when absent.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: SettingsSection,
    pub commands: Vec<CommandConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(settings: SettingsSection, commands: Vec<CommandConfig>) -> Self {
        Self { settings, commands }
    }

    /// Commands in file order.
    pub fn command_specs(&self) -> Vec<CommandSpec> {
        self.commands
            .iter()
            .map(|c| {
                let spec = CommandSpec::new(&c.name, &c.exec, &c.glob);
                match &c.cwd {
                    Some(cwd) => spec.with_cwd(cwd),
                    None => spec,
                }
            })
            .collect()
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            debounce: Duration::from_millis(self.settings.debounce_ms),
            cooldown: Duration::from_millis(self.settings.cooldown_ms),
            rescan_interval: Duration::from_secs(self.settings.rescan_secs),
        }
    }
}
