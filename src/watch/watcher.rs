// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::debounce::Debouncer;
use crate::errors::{Result, RorschError};
use crate::fs::FileSystem;
use crate::types::CommandSpec;
use crate::watch::patterns::{WatchPattern, discover_dirs};

/// Timing knobs shared by all watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Quiet period after the last change before a restart fires.
    pub debounce: Duration,
    /// Minimum time between two accepted triggers of the same command.
    pub cooldown: Duration,
    /// How often the glob is re-resolved to pick up new directories.
    pub rescan_interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            cooldown: Duration::from_secs(3),
            rescan_interval: Duration::from_secs(10),
        }
    }
}

/// What a [`FileWatcher`] reports to its command unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    /// A debounced change, described as `"<path> (<operation>)"`.
    Changed(String),
    /// A non-fatal problem with the watch itself.
    Warning(String),
}

/// Watches the directories matched by one command's glob.
///
/// Directories are watched non-recursively. New directories that start
/// matching are picked up by the periodic rescan; directories are never
/// unwatched.
pub struct FileWatcher {
    spec: Arc<CommandSpec>,
    options: WatchOptions,
    pattern: WatchPattern,
    fs: Arc<dyn FileSystem>,
    watcher: RecommendedWatcher,
    notify_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    watched: BTreeSet<PathBuf>,
    pending_warnings: Vec<String>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("command", &self.spec.name)
            .field("pattern", &self.pattern)
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Compile the glob, create the notification backend and resolve the
    /// initial set of directories.
    ///
    /// Directories that cannot be watched are not fatal; they are reported
    /// as warnings once [`run`](Self::run) starts.
    pub fn new(
        spec: Arc<CommandSpec>,
        options: WatchOptions,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let pattern = WatchPattern::new(&spec.glob)?;

        // notify calls this from its own thread.
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = notify_tx.send(res);
            },
            Config::default(),
        )
        .map_err(|source| RorschError::WatchSetup {
            command: spec.name.clone(),
            source,
        })?;

        let initial = discover_dirs(fs.as_ref(), &pattern).map_err(|err| {
            RorschError::GlobResolve {
                pattern: spec.glob.clone(),
                message: format!("{err:#}"),
            }
        })?;

        let mut this = Self {
            spec,
            options,
            pattern,
            fs,
            watcher,
            notify_rx,
            watched: BTreeSet::new(),
            pending_warnings: Vec::new(),
        };

        let warnings = this.watch_new_dirs(initial);
        this.pending_warnings = warnings;

        info!(
            command = %this.spec.name,
            glob = %this.spec.glob,
            dirs = this.watched.len(),
            "watching"
        );

        Ok(this)
    }

    pub fn command(&self) -> &str {
        &self.spec.name
    }

    /// Directories currently under observation.
    pub fn watched_dirs(&self) -> &BTreeSet<PathBuf> {
        &self.watched
    }

    /// Re-resolve the glob and watch any directory not yet watched.
    ///
    /// The directory walk runs on the blocking pool. Returns one warning per
    /// problem encountered.
    pub async fn rescan(&mut self) -> Vec<String> {
        let fs = Arc::clone(&self.fs);
        let pattern = self.pattern.clone();
        let resolved =
            tokio::task::spawn_blocking(move || discover_dirs(fs.as_ref(), &pattern)).await;

        match resolved {
            Ok(Ok(dirs)) => self.watch_new_dirs(dirs),
            Ok(Err(err)) => vec![format!("cannot resolve '{}': {err:#}", self.spec.glob)],
            Err(err) => vec![format!("resolving '{}' failed: {err}", self.spec.glob)],
        }
    }

    fn watch_new_dirs(&mut self, dirs: BTreeSet<PathBuf>) -> Vec<String> {
        let mut warnings = Vec::new();

        for dir in dirs {
            if self.watched.contains(&dir) {
                continue;
            }
            match self.watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    debug!(command = %self.spec.name, dir = ?dir, "watching directory");
                    self.watched.insert(dir);
                }
                Err(err) => {
                    warn!(command = %self.spec.name, dir = ?dir, error = %err, "cannot watch directory");
                    warnings.push(format!("cannot watch {}: {err}", dir.display()));
                }
            }
        }

        warnings
    }

    /// Forward debounced changes and warnings to `updates` until the
    /// receiving side goes away.
    pub async fn run(mut self, updates: mpsc::UnboundedSender<WatchSignal>) {
        for warning in std::mem::take(&mut self.pending_warnings) {
            let _ = updates.send(WatchSignal::Warning(warning));
        }

        let debouncer = Debouncer::new(self.options.cooldown);
        let period = self.options.rescan_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                notification = self.notify_rx.recv() => match notification {
                    Some(Ok(event)) => self.on_event(event, &debouncer, &updates),
                    Some(Err(err)) => {
                        warn!(command = %self.spec.name, error = %err, "file watch error");
                        let _ = updates.send(WatchSignal::Warning(err.to_string()));
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    for warning in self.rescan().await {
                        let _ = updates.send(WatchSignal::Warning(warning));
                    }
                }
                _ = updates.closed() => break,
            }
        }

        debug!(command = %self.spec.name, "watcher loop finished");
    }

    fn on_event(
        &self,
        event: Event,
        debouncer: &Debouncer<String>,
        updates: &mpsc::UnboundedSender<WatchSignal>,
    ) {
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }
        let Some(path) = event.paths.first() else {
            return;
        };
        if is_backup_file(path) {
            debug!(command = %self.spec.name, path = ?path, "ignoring backup file");
            return;
        }

        let description = format!("{} ({})", path.display(), describe_kind(&event.kind));
        debug!(command = %self.spec.name, change = %description, "change observed");

        let updates = updates.clone();
        debouncer.schedule(self.spec.name.clone(), self.options.debounce, move || {
            let _ = updates.send(WatchSignal::Changed(description));
        });
    }
}

fn is_backup_file(path: &Path) -> bool {
    path.to_string_lossy().ends_with('~')
}

fn describe_kind(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::Create(_) => "create",
        EventKind::Modify(ModifyKind::Metadata(_)) => "chmod",
        EventKind::Modify(ModifyKind::Name(_)) => "rename",
        EventKind::Modify(_) => "write",
        EventKind::Remove(_) => "remove",
        _ => "change",
    }
}
