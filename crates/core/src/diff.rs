//! Snapshot differencing
//!
//! Turns a previous and a current snapshot of the same root into change
//! records ordered by relative path.

use crate::snapshot::Snapshot;
use std::cmp::Ordering;

/// Kind of change for a single path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// First sighting of the path
    ///
    /// `parent_known` is true when the parent directory (or, for top-level
    /// entries, the root) was already present in the previous snapshot.
    Added { parent_known: bool },
    /// Path present in both snapshots; true when it changed
    Modified(bool),
    /// Path no longer present
    Removed,
}

/// A change to one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Path relative to the root, `/`-separated
    pub path: String,
    /// What happened to it
    pub kind: ChangeKind,
}

impl Change {
    fn new(path: &str, kind: ChangeKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
        }
    }
}

/// Options for [`diff_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Emit `Modified(false)` for entries that did not change
    pub report_unchanged: bool,
}

/// Diff two snapshots with default options
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<Change> {
    diff_with(previous, current, DiffOptions::default())
}

/// Replay of a snapshot as seen by someone who knows nothing yet
pub fn bootstrap(current: &Snapshot) -> Vec<Change> {
    diff(&Snapshot::missing(), current)
}

/// Diff two snapshots
///
/// Both snapshots iterate in path order, so a single merge pass yields
/// changes already sorted.
pub fn diff_with(previous: &Snapshot, current: &Snapshot, options: DiffOptions) -> Vec<Change> {
    let mut changes = Vec::new();
    let mut old = previous.iter().peekable();
    let mut new = current.iter().peekable();

    loop {
        let order = match (old.peek(), new.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((old_path, _)), Some((new_path, _))) => old_path.cmp(new_path),
        };

        match order {
            Ordering::Less => {
                if let Some((path, _)) = old.next() {
                    changes.push(Change::new(path, ChangeKind::Removed));
                }
            }
            Ordering::Greater => {
                if let Some((path, _)) = new.next() {
                    let parent_known = parent_known(previous, path);
                    changes.push(Change::new(path, ChangeKind::Added { parent_known }));
                }
            }
            Ordering::Equal => {
                if let (Some((path, before)), Some((_, after))) = (old.next(), new.next()) {
                    let changed = before.changed_from(after);
                    if changed || options.report_unchanged {
                        changes.push(Change::new(path, ChangeKind::Modified(changed)));
                    }
                }
            }
        }
    }

    changes
}

/// Whether the directory containing `path` was present in `previous`
fn parent_known(previous: &Snapshot, path: &str) -> bool {
    match path.rsplit_once('/') {
        Some((parent, _)) => previous.get(parent).is_some_and(|state| state.is_dir()),
        None => previous.root_exists(),
    }
}
