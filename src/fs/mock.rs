// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Dir(Vec<String>), // List of child names
    /// Symlink to another entry, given by its key.
    Link(PathBuf),
}

/// In-memory directory tree for discovery tests.
///
/// Paths are used exactly as given; parents are created implicitly.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.lock();
        entries.insert(path.to_path_buf(), MockEntry::File);
        link_to_parent(&mut entries, path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.lock();
        ensure_dir(&mut entries, path);
    }

    /// `path -> target`, where `target` is the key of an existing entry
    /// (`"."` for the root).
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.lock();
        entries.insert(path.to_path_buf(), MockEntry::Link(target.as_ref().to_path_buf()));
        link_to_parent(&mut entries, path);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ensure_dir(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    link_to_parent(entries, path);
}

fn link_to_parent(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    // Avoid infinite loop at "." and "/".
    if parent == path {
        return;
    }

    ensure_dir(entries, parent);

    if let (Some(MockEntry::Dir(children)), Some(name)) = (
        entries.get_mut(parent),
        path.file_name().and_then(|n| n.to_str()),
    ) {
        if !children.iter().any(|c| c == name) {
            children.push(name.to_string());
        }
    }
}

/// Key of the entry `path` points at, following links component by component.
fn resolve(entries: &BTreeMap<PathBuf, MockEntry>, path: &Path) -> PathBuf {
    let mut key = PathBuf::new();
    for component in path.components() {
        if component == Component::CurDir {
            continue;
        }
        key.push(component);
        if let Some(MockEntry::Link(target)) = entries.get(&key) {
            key = if target == Path::new(".") {
                PathBuf::new()
            } else {
                target.clone()
            };
        }
    }
    if key.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        key
    }
}

impl FileSystem for MockFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        let entries = self.lock();
        matches!(entries.get(&resolve(&entries, path)), Some(MockEntry::File))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let entries = self.lock();
        matches!(entries.get(&resolve(&entries, path)), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.lock();
        match entries.get(&resolve(&entries, path)) {
            // Children of "." are keyed without a "./" prefix.
            Some(MockEntry::Dir(children)) if path == Path::new(".") => {
                Ok(children.iter().map(PathBuf::from).collect())
            }
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let entries = self.lock();
        let key = resolve(&entries, path);
        if entries.contains_key(&key) {
            Ok(key)
        } else {
            Err(anyhow!("No such entry: {:?}", path))
        }
    }
}
