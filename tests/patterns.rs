// tests/patterns.rs

use std::collections::BTreeSet;
use std::path::PathBuf;

use proptest::prelude::*;

use rorsch::fs::mock::MockFileSystem;
use rorsch::watch::{WatchPattern, discover_dirs, split_pattern};

fn split(glob: &str) -> (String, String) {
    split_pattern(glob)
}

fn dirs(paths: &[&str]) -> BTreeSet<PathBuf> {
    paths.iter().map(PathBuf::from).collect()
}

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("main.go");
    fs.add_file("src/main.go");
    fs.add_file("src/README.md");
    fs.add_file("src/pkg/util.go");
    fs.add_file("src/pkg/deep/er/x.go");
    fs.add_file("src/assets/logo.png");
    fs.add_file("docs/guide.go");
    fs.add_dir("src/empty");
    fs
}

#[test]
fn split_at_last_separator_before_first_wildcard() {
    assert_eq!(split("src/**/*.go"), ("src".into(), "**/*.go".into()));
    assert_eq!(split("a/b/c*/d.txt"), ("a/b".into(), "c*/d.txt".into()));
    assert_eq!(split("*.go"), (".".into(), "*.go".into()));
    assert_eq!(split("/abs/dir/*.rs"), ("/abs/dir".into(), "*.rs".into()));
    assert_eq!(split("/*.rs"), ("/".into(), "*.rs".into()));
    assert_eq!(split("src/{a,b}.go"), ("src".into(), "{a,b}.go".into()));
}

#[test]
fn literal_globs_split_into_parent_and_file() {
    assert_eq!(split("src/main.go"), ("src".into(), "main.go".into()));
    assert_eq!(split("main.go"), (".".into(), "main.go".into()));
}

#[test]
fn star_does_not_cross_directories() {
    let pattern = WatchPattern::new("src/*.go").unwrap();
    assert!(pattern.matches("main.go"));
    assert!(!pattern.matches("pkg/util.go"));
}

#[test]
fn double_star_matches_zero_or_more_directories() {
    let pattern = WatchPattern::new("src/**/*.go").unwrap();
    assert_eq!(pattern.base(), PathBuf::from("src"));
    assert_eq!(pattern.pattern(), "**/*.go");
    assert!(pattern.matches("main.go"));
    assert!(pattern.matches("pkg/util.go"));
    assert!(pattern.matches("pkg/deep/er/x.go"));
    assert!(!pattern.matches("README.md"));
}

#[test]
fn discovery_returns_directories_holding_matches() {
    let fs = project();
    let pattern = WatchPattern::new("src/**/*.go").unwrap();
    assert_eq!(
        discover_dirs(&fs, &pattern).unwrap(),
        dirs(&["src", "src/pkg", "src/pkg/deep/er"])
    );
}

#[test]
fn discovery_honours_single_level_wildcards() {
    let fs = project();

    let pattern = WatchPattern::new("src/*.go").unwrap();
    assert_eq!(discover_dirs(&fs, &pattern).unwrap(), dirs(&["src"]));

    let pattern = WatchPattern::new("*.go").unwrap();
    assert_eq!(discover_dirs(&fs, &pattern).unwrap(), dirs(&["."]));

    let pattern = WatchPattern::new("src/*/*.go").unwrap();
    assert_eq!(discover_dirs(&fs, &pattern).unwrap(), dirs(&["src/pkg"]));
}

#[test]
fn discovery_of_a_literal_file() {
    let fs = project();
    let pattern = WatchPattern::new("src/pkg/util.go").unwrap();
    assert_eq!(discover_dirs(&fs, &pattern).unwrap(), dirs(&["src/pkg"]));
}

#[test]
fn missing_base_directory_has_no_matches() {
    let fs = project();
    let pattern = WatchPattern::new("nowhere/**/*.go").unwrap();
    assert!(discover_dirs(&fs, &pattern).unwrap().is_empty());
}

#[test]
fn no_matching_files_means_no_directories() {
    let fs = project();
    let pattern = WatchPattern::new("src/**/*.rs").unwrap();
    assert!(discover_dirs(&fs, &pattern).unwrap().is_empty());
}

#[test]
fn symlinked_directories_are_walked_once() {
    let fs = MockFileSystem::new();
    fs.add_file("src/main.go");
    fs.add_file("src/pkg/util.go");
    fs.add_symlink("src/self", "src");
    fs.add_symlink("src/pkg/back", "src");

    let pattern = WatchPattern::new("src/**/*.go").unwrap();
    assert_eq!(discover_dirs(&fs, &pattern).unwrap(), dirs(&["src", "src/pkg"]));
}

#[cfg(unix)]
#[test]
fn symlink_loops_on_disk_terminate() -> Result<(), Box<dyn std::error::Error>> {
    use std::os::unix::fs::symlink;
    use std::sync::mpsc;
    use std::time::Duration;

    use rorsch::fs::RealFileSystem;

    let dir = tempfile::tempdir()?;
    let src = dir.path().join("src");
    std::fs::create_dir_all(src.join("pkg"))?;
    std::fs::write(src.join("main.go"), "package main\n")?;
    std::fs::write(src.join("pkg/util.go"), "package pkg\n")?;
    symlink("..", src.join("up"))?;
    symlink(".", src.join("self"))?;

    let pattern = WatchPattern::new(&format!("{}/**/*.go", src.display()))?;
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(discover_dirs(&RealFileSystem, &pattern).map_err(|e| e.to_string()));
    });
    let found = rx.recv_timeout(Duration::from_secs(10))??;

    let expected: BTreeSet<PathBuf> = [src.clone(), src.join("pkg")].into_iter().collect();
    assert_eq!(found, expected);
    Ok(())
}

#[test]
fn invalid_patterns_fail_to_compile() {
    assert!(WatchPattern::new("src/[.go").is_err());
    assert!(WatchPattern::new("src/{a,b.go").is_err());
}

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,8}"
}

proptest! {
    #[test]
    fn base_is_the_literal_directory_prefix(
        dirs in proptest::collection::vec(segment(), 1..4),
        tail in "(\\*\\*/)?\\*\\.[a-z]{1,3}",
    ) {
        let base = dirs.join("/");
        let glob = format!("{base}/{tail}");
        let (got_base, got_pattern) = split_pattern(&glob);
        prop_assert_eq!(&got_base, &base);
        prop_assert_eq!(&got_pattern, &tail);
        prop_assert_eq!(format!("{got_base}/{got_pattern}"), glob);
    }

    #[test]
    fn pattern_never_starts_with_a_separator(glob in "[a-z/]{0,6}[*?][a-z/*]{0,6}") {
        let (base, pattern) = split_pattern(&glob);
        prop_assert!(!pattern.starts_with('/'));
        prop_assert!(!base.is_empty());
    }
}
