//! Polling file system watcher for treewatch
//!
//! This crate provides the watch engine:
//! - A background scan loop on a fixed poll interval
//! - Per-root snapshots diffed into path-ordered change events
//! - Listener registration with bootstrap replay of current state
//! - Root registration while the loop is running
//!
//! Change detection is mtime based. Anything that happens and is undone
//! between two passes is never seen.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod listener;

mod roots;
mod scan;

pub use config::WatcherConfig;
pub use engine::{FileSystemWatcher, WatcherState};
pub use error::{Result, WatchError};
pub use event::{EventKind, WatchEvent};
pub use listener::{ChannelListener, ListenerId, WatcherListener};
