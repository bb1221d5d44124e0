//! Index of files already present in the library.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument};

use super::planner::LIBRARY_DIRS;

/// Set of normalized paths under the library's type folders.
///
/// Lookups are case-insensitive so a file downloaded on a case-insensitive
/// volume still matches a planned path that differs only in case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingIndex {
    paths: HashSet<String>,
}

impl ExistingIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `path` is in the index.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(&normalize_path(path))
    }

    /// Adds `path`. Returns false when it was already present.
    pub fn insert(&mut self, path: &Path) -> bool {
        self.paths.insert(normalize_path(path))
    }

    /// Number of indexed files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true when no file is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Lists every file below `root/Films`, `root/Series` and `root/Autre`.
///
/// Missing type folders and unreadable subtrees are skipped.
#[instrument(fields(root = %root.display()))]
pub fn build_index(root: &Path) -> ExistingIndex {
    let mut index = ExistingIndex::new();
    for dir in LIBRARY_DIRS {
        let base = root.join(dir);
        if base.is_dir() {
            collect_files(&base, &mut index);
        }
    }
    debug!(files = index.len(), "existing-file index built");
    index
}

fn collect_files(dir: &Path, index: &mut ExistingIndex) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            debug!(dir = %dir.display(), %error, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        match entry.file_type() {
            Ok(kind) if kind.is_dir() => collect_files(&path, index),
            Ok(kind) if kind.is_file() => {
                index.insert(&path);
            }
            // Linked files count; linked directories are never descended into.
            Ok(_) => {
                if path.is_file() {
                    index.insert(&path);
                } else if path.is_dir() {
                    debug!(path = %path.display(), "skipping symlinked directory");
                }
            }
            Err(error) => debug!(path = %path.display(), %error, "skipping unreadable entry"),
        }
    }
}

/// Absolute, lexically cleaned, lower-cased form of `path`.
///
/// `.` and `..` are resolved without touching the file system, so the path
/// need not exist.
#[must_use]
pub fn normalize_path(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned.to_string_lossy().to_lowercase()
}
