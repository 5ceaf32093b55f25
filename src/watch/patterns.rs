// src/watch/patterns.rs

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::errors::RorschError;
use crate::fs::FileSystem;

const META_CHARS: [char; 5] = ['*', '?', '[', '{', '\\'];

/// A compiled watch glob, split into a literal base directory and the
/// pattern evaluated relative to it.
///
/// `src/**/*.go` becomes base `src` + pattern `**/*.go`. In the pattern,
/// `*` never crosses a `/`, while a `**` segment matches any number of
/// directories (including none).
#[derive(Clone)]
pub struct WatchPattern {
    raw: String,
    base: PathBuf,
    pattern: String,
    matcher: GlobMatcher,
    /// Number of path segments a match can have, unless the pattern
    /// contains `**`.
    max_segments: Option<usize>,
}

impl fmt::Debug for WatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchPattern")
            .field("base", &self.base)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

impl WatchPattern {
    pub fn new(glob: &str) -> Result<Self, RorschError> {
        let (base, pattern) = split_pattern(glob);

        let matcher = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| RorschError::Glob {
                pattern: glob.to_string(),
                source,
            })?
            .compile_matcher();

        let max_segments = if pattern.contains("**") {
            None
        } else {
            Some(pattern.split('/').count())
        };

        Ok(Self {
            raw: glob.to_string(),
            base: PathBuf::from(base),
            pattern,
            matcher,
            max_segments,
        })
    }

    /// The glob as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether a path relative to [`base`](Self::base), with forward
    /// slashes, matches.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

/// Split a glob at the last `/` before its first wildcard.
///
/// Globs without wildcards are split into their parent directory and file
/// name. A glob whose first segment already has a wildcard gets base `"."`.
pub fn split_pattern(glob: &str) -> (String, String) {
    let literal_end = glob.find(META_CHARS).unwrap_or(glob.len());

    match glob[..literal_end].rfind('/') {
        Some(0) => ("/".to_string(), glob[1..].to_string()),
        Some(idx) => (glob[..idx].to_string(), glob[idx + 1..].to_string()),
        None => (".".to_string(), glob.to_string()),
    }
}

/// Enumerate files matching `pattern` and return the set of directories
/// that contain at least one match.
///
/// A missing base directory is not an error; it just has no matches yet.
/// Unreadable directories below the base are skipped. Each real directory
/// is walked once, so symlinks pointing back up the tree do not loop.
pub fn discover_dirs(fs: &dyn FileSystem, pattern: &WatchPattern) -> Result<BTreeSet<PathBuf>> {
    let base = pattern.base();
    let mut dirs = BTreeSet::new();

    if !fs.is_dir(base) {
        debug!(base = ?base, glob = %pattern.as_str(), "glob base directory does not exist (yet)");
        return Ok(dirs);
    }

    // (directory, number of segments between base and its entries)
    let mut stack = vec![(base.to_path_buf(), 1usize)];
    let mut visited = HashSet::new();

    while let Some((dir, segments)) = stack.pop() {
        let real = match fs.canonicalize(&dir) {
            Ok(real) => real,
            Err(err) if dir != base => {
                debug!(dir = ?dir, error = %err, "skipping unresolvable directory");
                continue;
            }
            Err(err) => return Err(err),
        };
        if !visited.insert(real) {
            debug!(dir = ?dir, "directory already walked under another path");
            continue;
        }

        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if dir != base => {
                debug!(dir = ?dir, error = %err, "skipping unreadable directory");
                continue;
            }
            Err(err) => return Err(err),
        };

        for path in entries {
            if fs.is_dir(&path) {
                let deeper = pattern.max_segments.is_none_or(|max| segments < max);
                if deeper {
                    stack.push((path, segments + 1));
                }
            } else if fs.is_file(&path) {
                let rel = path.strip_prefix(base).unwrap_or(&path);
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                if pattern.matches(&rel_str) {
                    if let Some(parent) = path.parent() {
                        let parent = if parent.as_os_str().is_empty() {
                            Path::new(".")
                        } else {
                            parent
                        };
                        dirs.insert(parent.to_path_buf());
                    }
                }
            }
        }
    }

    Ok(dirs)
}
