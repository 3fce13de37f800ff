//! Owned watch events for message-passing consumers

use serde::Serialize;
use std::path::{Path, PathBuf};

/// A change delivered to a listener, as an owned value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEvent {
    /// Watched root the path is relative to
    pub root: PathBuf,
    /// Path relative to the root, `/`-separated
    pub path: String,
    /// Type of change
    pub kind: EventKind,
}

impl WatchEvent {
    /// Event for a path that exists
    pub fn exists(root: &Path, path: &str, modified: Option<bool>) -> Self {
        Self {
            root: root.to_path_buf(),
            path: path.to_string(),
            kind: EventKind::Exists { modified },
        }
    }

    /// Event for a path that was removed
    pub fn removed(root: &Path, path: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            path: path.to_string(),
            kind: EventKind::Removed,
        }
    }
}

/// Type of watch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    /// Path exists
    ///
    /// `None` on the first sighting with no baseline, `Some(false)` for a
    /// new entry under a known directory or an unchanged entry,
    /// `Some(true)` when the file's mtime changed.
    Exists { modified: Option<bool> },
    /// Path was removed
    Removed,
}
