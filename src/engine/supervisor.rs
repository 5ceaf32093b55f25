// src/engine/supervisor.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::engine::Event;
use crate::engine::unit::{CommandUnit, Control};
use crate::errors::{Result, RorschError};
use crate::exec::ProcessRunner;
use crate::fs::FileSystem;
use crate::types::CommandSpec;
use crate::watch::{FileWatcher, WatchOptions};

/// Capacity of each runner's message channel.
const RUNNER_CHANNEL_CAPACITY: usize = 256;

/// Remote control for one running command.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    name: String,
    control: mpsc::UnboundedSender<Control>,
}

impl CommandHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Restart the command as if a file had changed, without a
    /// `ChangeDetected` event.
    ///
    /// Returns `false` if the command has already shut down.
    pub fn restart(&self) -> bool {
        self.send(Control::Restart)
    }

    /// Kill the command's current process. The outcome is reported as
    /// [`Event::RunStopped`].
    ///
    /// Returns `false` if the command has already shut down.
    pub fn stop(&self) -> bool {
        self.send(Control::Stop)
    }

    fn send(&self, control: Control) -> bool {
        self.control.send(control).is_ok()
    }
}

/// One watch → debounce → run pipeline per command, all reporting into a
/// single event stream.
pub struct Supervisor {
    handles: Vec<CommandHandle>,
    tasks: JoinSet<()>,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.handles.iter().map(|h| h.name.as_str()).collect();
        f.debug_struct("Supervisor")
            .field("commands", &names)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Start every command.
    ///
    /// All watchers are set up before the first process is spawned, so an
    /// invalid glob or a failing watch backend aborts startup with nothing
    /// left running. Must be called from within a Tokio runtime.
    pub fn start(
        specs: Vec<CommandSpec>,
        options: WatchOptions,
        fs: Arc<dyn FileSystem>,
        events: mpsc::Sender<Event>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut prepared = Vec::with_capacity(specs.len());

        for spec in specs {
            if !seen.insert(spec.name.clone()) {
                return Err(RorschError::ConfigError(format!(
                    "duplicate command name '{}'",
                    spec.name
                )));
            }
            let spec = Arc::new(spec);
            let watcher = FileWatcher::new(Arc::clone(&spec), options, Arc::clone(&fs))?;
            prepared.push((spec, watcher));
        }

        let mut handles = Vec::with_capacity(prepared.len());
        let mut tasks = JoinSet::new();

        for (spec, watcher) in prepared {
            let (runner_tx, runner_rx) = mpsc::channel(RUNNER_CHANNEL_CAPACITY);
            let (watch_tx, watch_rx) = mpsc::unbounded_channel();
            let (control_tx, control_rx) = mpsc::unbounded_channel();

            let runner = Arc::new(ProcessRunner::new(Arc::clone(&spec), runner_tx));
            let unit = CommandUnit::new(runner, runner_rx, watch_rx, control_rx, events.clone());

            tasks.spawn(unit.run());
            tasks.spawn(watcher.run(watch_tx));

            handles.push(CommandHandle {
                name: spec.name.clone(),
                control: control_tx,
            });
        }

        info!(commands = handles.len(), "supervisor started");

        Ok(Self { handles, tasks })
    }

    pub fn handle(&self, name: &str) -> Option<CommandHandle> {
        self.handles.iter().find(|h| h.name == name).cloned()
    }

    pub fn handles(&self) -> &[CommandHandle] {
        &self.handles
    }

    /// Stop every process, then wait for all units and watchers to end.
    ///
    /// Each command's remaining events are delivered before its unit ends.
    pub async fn shutdown(mut self) {
        for handle in &self.handles {
            handle.send(Control::Shutdown);
        }

        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "supervisor task failed");
            }
        }

        info!("supervisor stopped");
    }
}
