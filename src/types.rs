use std::fmt;
use std::path::PathBuf;

/// Identifier of a single run of a command.
///
/// Runs are numbered per command starting at 1; every call to
/// `ProcessRunner::start` takes the next number, including runs whose spawn
/// fails.
pub type RunId = u64;

/// Immutable description of one watched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Unique name, used as the key for debouncing and in every event.
    pub name: String,
    /// Command line: executable followed by whitespace-separated arguments.
    pub exec: String,
    /// Watch pattern, e.g. `src/**/*.go`.
    pub glob: String,
    /// Working directory for the spawned process. `None` inherits ours.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, exec: impl Into<String>, glob: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exec: exec.into(),
            glob: glob.into(),
            cwd: None,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Lifecycle status of a command's current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "ok",
            RunStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}
