// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Splitting a command's glob into a base directory and a pattern, and
//!   resolving it to the directories that hold matching files.
//! - Wiring up a cross-platform filesystem watcher (`notify`) on those
//!   directories and re-resolving the glob periodically.
//! - Debouncing bursts of changes into single [`WatchSignal::Changed`]
//!   signals.
//!
//! It does **not** know about processes; it only turns filesystem changes
//! into per-command triggers.

pub mod patterns;
pub mod watcher;

pub use patterns::{WatchPattern, discover_dirs, split_pattern};
pub use watcher::{FileWatcher, WatchOptions, WatchSignal};
