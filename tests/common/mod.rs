#![allow(dead_code)]

pub use rorsch_test_utils::builders;
pub use rorsch_test_utils::events;
pub use rorsch_test_utils::{init_tracing, with_timeout, write_file};

use std::time::Duration;

use rorsch::watch::WatchOptions;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Short timings so watcher-driven tests finish quickly.
pub fn fast_options() -> WatchOptions {
    WatchOptions {
        debounce: Duration::from_millis(100),
        cooldown: Duration::ZERO,
        rescan_interval: Duration::from_secs(10),
    }
}
