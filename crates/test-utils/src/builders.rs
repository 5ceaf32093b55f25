#![allow(dead_code)]

use std::path::PathBuf;

use rorsch::config::{CommandConfig, ConfigFile, RawConfigFile, SettingsSection};
use rorsch::types::CommandSpec;

/// Builder for `CommandSpec` to simplify test setup.
pub struct CommandSpecBuilder {
    spec: CommandSpec,
}

impl CommandSpecBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            spec: CommandSpec::new(name, "true", "*"),
        }
    }

    pub fn exec(mut self, exec: &str) -> Self {
        self.spec.exec = exec.to_string();
        self
    }

    pub fn glob(mut self, glob: &str) -> Self {
        self.spec.glob = glob.to_string();
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.spec.cwd = Some(cwd.into());
        self
    }

    pub fn build(self) -> CommandSpec {
        self.spec
    }
}

/// Builder for `ConfigFile`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                settings: SettingsSection::default(),
                command: Vec::new(),
            },
        }
    }

    pub fn with_command(mut self, name: &str, exec: &str, glob: &str) -> Self {
        self.config.command.push(CommandConfig {
            name: name.to_string(),
            exec: exec.to_string(),
            glob: glob.to_string(),
            cwd: None,
        });
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.settings.debounce_ms = ms;
        self
    }

    pub fn with_cooldown_ms(mut self, ms: u64) -> Self {
        self.config.settings.cooldown_ms = ms;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
