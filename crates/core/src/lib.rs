//! Snapshot and diff primitives for treewatch
//!
//! This crate provides:
//! - Per-path entry metadata (kind + modification time)
//! - Recursive tree snapshots keyed by forward-slash relative paths
//! - Gitignore-style exclude rules applied during the walk
//! - Path-ordered diffing of two snapshots into change records

pub mod diff;
pub mod entry;
pub mod ignore;
pub mod snapshot;

pub use diff::{bootstrap, diff, diff_with, Change, ChangeKind, DiffOptions};
pub use entry::{EntryKind, EntryState};
pub use ignore::{IgnoreConfig, IgnoreRules};
pub use snapshot::{Snapshot, SnapshotOptions, Snapshotter};
