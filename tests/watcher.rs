// tests/watcher.rs

mod common;
use crate::common::builders::CommandSpecBuilder;
use crate::common::{TestResult, fast_options, init_tracing, with_timeout, write_file};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use rorsch::errors::RorschError;
use rorsch::fs::RealFileSystem;
use rorsch::fs::mock::MockFileSystem;
use rorsch::watch::{FileWatcher, WatchSignal};

fn go_watcher(root: &Path) -> Result<FileWatcher, RorschError> {
    let spec = CommandSpecBuilder::new("build")
        .exec("echo hello")
        .glob(&format!("{}/src/**/*.go", root.display()))
        .build();
    FileWatcher::new(Arc::new(spec), fast_options(), Arc::new(RealFileSystem))
}

/// Drain everything currently queued, returning only `Changed` descriptions.
fn drain_changes(rx: &mut mpsc::UnboundedReceiver<WatchSignal>) -> Vec<String> {
    let mut changes = Vec::new();
    while let Ok(signal) = rx.try_recv() {
        if let WatchSignal::Changed(description) = signal {
            changes.push(description);
        }
    }
    changes
}

#[tokio::test]
async fn write_to_matching_file_yields_exactly_one_change() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let file = write_file(dir.path(), "src/main.go", "package main\n");

    let watcher = go_watcher(dir.path())?;
    assert_eq!(watcher.watched_dirs().len(), 1);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(watcher.run(tx));
    sleep(Duration::from_millis(100)).await;

    // Several notifications for one save collapse into one change.
    std::fs::write(&file, "package main\n\nfunc main() {}\n")?;
    std::fs::write(&file, "package main\n\nfunc main() { }\n")?;

    let signal = with_timeout(rx.recv()).await.ok_or("watcher stopped")?;
    match signal {
        WatchSignal::Changed(description) => {
            assert!(description.contains("main.go"), "{description}");
            assert!(description.ends_with(')'), "{description}");
        }
        other => panic!("expected a change, got {other:?}"),
    }

    sleep(Duration::from_millis(400)).await;
    assert!(drain_changes(&mut rx).is_empty());

    drop(rx);
    with_timeout(task).await?;
    Ok(())
}

#[tokio::test]
async fn backup_files_are_ignored() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "src/main.go", "package main\n");

    let watcher = go_watcher(dir.path())?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(watcher.run(tx));
    sleep(Duration::from_millis(100)).await;

    write_file(dir.path(), "src/main.go~", "backup\n");
    sleep(Duration::from_millis(400)).await;
    assert!(drain_changes(&mut rx).is_empty());

    drop(rx);
    with_timeout(task).await?;
    Ok(())
}

#[tokio::test]
async fn rescan_picks_up_new_directories_and_never_forgets_old_ones() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "src/main.go", "package main\n");

    let mut watcher = go_watcher(dir.path())?;
    let before = watcher.watched_dirs().clone();
    assert_eq!(before.len(), 1);

    write_file(dir.path(), "src/pkg/util.go", "package pkg\n");
    assert!(with_timeout(watcher.rescan()).await.is_empty());
    assert_eq!(watcher.watched_dirs().len(), 2);

    // Matches disappearing does not shrink the set.
    std::fs::remove_file(dir.path().join("src/main.go"))?;
    assert!(with_timeout(watcher.rescan()).await.is_empty());
    assert!(watcher.watched_dirs().is_superset(&before));
    assert_eq!(watcher.watched_dirs().len(), 2);
    Ok(())
}

#[tokio::test]
async fn unwatchable_directories_become_warnings() -> TestResult {
    init_tracing();
    // Only exists in the mock, so the real notify backend cannot watch it.
    let fs = MockFileSystem::new();
    fs.add_file("/rorsch-test-nowhere/src/a.go");

    let spec = CommandSpecBuilder::new("ghost")
        .glob("/rorsch-test-nowhere/src/*.go")
        .build();
    let mut watcher = FileWatcher::new(Arc::new(spec), fast_options(), Arc::new(fs))?;
    assert!(watcher.watched_dirs().is_empty());

    // Still failing on rescan, still not fatal.
    assert_eq!(with_timeout(watcher.rescan()).await.len(), 1);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(watcher.run(tx));

    let signal = with_timeout(rx.recv()).await.ok_or("watcher stopped")?;
    match signal {
        WatchSignal::Warning(message) => {
            assert!(message.contains("/rorsch-test-nowhere/src"), "{message}");
        }
        other => panic!("expected a warning, got {other:?}"),
    }

    drop(rx);
    with_timeout(task).await?;
    Ok(())
}

#[test]
fn invalid_glob_is_rejected_at_construction() {
    init_tracing();
    let spec = CommandSpecBuilder::new("broken").glob("src/[.go").build();
    let err = FileWatcher::new(Arc::new(spec), fast_options(), Arc::new(RealFileSystem))
        .expect_err("glob should not compile");
    assert!(matches!(err, RorschError::Glob { .. }), "{err}");
}

#[test]
fn missing_base_directory_is_not_an_error() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let watcher = go_watcher(dir.path())?;
    assert!(watcher.watched_dirs().is_empty());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_loops_do_not_multiply_watches() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "src/main.go", "package main\n");
    write_file(dir.path(), "src/pkg/util.go", "package pkg\n");
    std::os::unix::fs::symlink("..", dir.path().join("src/up"))?;
    std::os::unix::fs::symlink(".", dir.path().join("src/self"))?;

    let root = dir.path().to_path_buf();
    let mut watcher = with_timeout(tokio::task::spawn_blocking(move || go_watcher(&root))).await??;
    assert_eq!(watcher.watched_dirs().len(), 2);

    assert!(with_timeout(watcher.rescan()).await.is_empty());
    assert_eq!(watcher.watched_dirs().len(), 2);
    Ok(())
}
