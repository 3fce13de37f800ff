//! Per-path metadata recorded in a snapshot

use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::time::SystemTime;

/// Type of snapshot entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file (symlinks that are not followed count as files)
    File,
    /// Directory
    Directory,
}

/// State of a single path at the time of a snapshot
///
/// Directories never carry a modification time: they are tracked for
/// existence and removal only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryState {
    /// Kind of entry
    pub kind: EntryKind,
    /// Last modification time (files only, `None` if unavailable)
    pub modified: Option<SystemTime>,
}

impl EntryState {
    /// Create a file entry
    pub fn file(modified: Option<SystemTime>) -> Self {
        Self {
            kind: EntryKind::File,
            modified,
        }
    }

    /// Create a directory entry
    pub fn directory() -> Self {
        Self {
            kind: EntryKind::Directory,
            modified: None,
        }
    }

    /// Build an entry from filesystem metadata
    pub fn from_metadata(metadata: &Metadata) -> Self {
        if metadata.is_dir() {
            Self::directory()
        } else {
            Self::file(metadata.modified().ok())
        }
    }

    /// Check if this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Check whether `other` represents a change relative to `self`
    ///
    /// A kind change always counts. Between two files only the mtime is
    /// compared, so resolution is the filesystem's mtime granularity.
    pub fn changed_from(&self, other: &EntryState) -> bool {
        match (self.kind, other.kind) {
            (EntryKind::Directory, EntryKind::Directory) => false,
            (EntryKind::File, EntryKind::File) => self.modified != other.modified,
            _ => true,
        }
    }
}
