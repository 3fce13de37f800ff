//! Error types for the watch engine.

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors returned by the watch engine.
///
/// None of these stop a running scan loop; they are reported to the caller
/// of the failing operation only.
#[derive(Error, Debug)]
pub enum WatchError {
    /// `start()` called while the loop is running.
    #[error("watcher already running")]
    AlreadyRunning,

    /// `stop()` called on a watcher that was never started.
    #[error("watcher is not running")]
    NotRunning,

    /// Operation on a watcher that has been stopped.
    #[error("watcher has been stopped")]
    Stopped,

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file parse error.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The scan thread could not be spawned.
    #[error("failed to spawn scan thread: {0}")]
    Spawn(#[source] std::io::Error),
}
