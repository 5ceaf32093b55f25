// src/config/mod.rs

//! Configuration loading and validation for rorsch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like unique command names (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    DEFAULT_CONFIG_FILE, default_config_path, load_and_validate, load_from_path, load_from_str,
};
pub use model::{CommandConfig, ConfigFile, RawConfigFile, SettingsSection};
