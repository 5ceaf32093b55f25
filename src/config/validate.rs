// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{CommandConfig, ConfigFile, RawConfigFile, SettingsSection};
use crate::errors::{Result, RorschError};
use crate::watch::WatchPattern;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RorschError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.settings, raw.command))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_commands(cfg)?;
    validate_settings(&cfg.settings)?;
    validate_names(&cfg.command)?;
    for command in &cfg.command {
        validate_command(command)?;
    }
    Ok(())
}

fn ensure_has_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.command.is_empty() {
        return Err(RorschError::ConfigError(
            "config must contain at least one [[command]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_settings(settings: &SettingsSection) -> Result<()> {
    if settings.debounce_ms == 0 {
        return Err(RorschError::ConfigError(
            "[settings].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if settings.rescan_secs == 0 {
        return Err(RorschError::ConfigError(
            "[settings].rescan_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_names(commands: &[CommandConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for (idx, command) in commands.iter().enumerate() {
        if command.name.trim().is_empty() {
            return Err(RorschError::ConfigError(format!(
                "command #{} has an empty name",
                idx + 1
            )));
        }
        if !seen.insert(command.name.as_str()) {
            return Err(RorschError::ConfigError(format!(
                "duplicate command name '{}'",
                command.name
            )));
        }
    }
    Ok(())
}

fn validate_command(command: &CommandConfig) -> Result<()> {
    if command.exec.trim().is_empty() {
        return Err(RorschError::ConfigError(format!(
            "command '{}' has an empty `exec`",
            command.name
        )));
    }
    if command.glob.trim().is_empty() {
        return Err(RorschError::ConfigError(format!(
            "command '{}' has an empty `glob`",
            command.name
        )));
    }
    WatchPattern::new(&command.glob)?;
    Ok(())
}
