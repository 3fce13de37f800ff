//! The watch engine: lifecycle, background scan loop and public API.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::config::WatcherConfig;
use crate::error::{Result, WatchError};
use crate::listener::{panic_message, ListenerId, ListenerRegistry, WatcherListener};
use crate::roots::RootRegistry;
use crate::scan::Scanner;

/// Lifecycle state of a [`FileSystemWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Constructed, loop not started.
    Idle,
    /// Background loop running.
    Running,
    /// Loop halted; terminal.
    Stopped,
}

/// State shared with the scan thread.
struct Shared {
    config: WatcherConfig,
    roots: RootRegistry,
    listeners: ListenerRegistry,
    scanner: Scanner,
}

impl Shared {
    fn run_pass(&self) {
        self.scanner.run_pass(&self.roots, &self.listeners);
    }
}

enum Lifecycle {
    Idle,
    Running {
        stop_tx: Sender<()>,
        handle: JoinHandle<()>,
    },
    Stopped,
}

/// Polling watcher for one or more directory trees.
///
/// Every poll interval the background thread snapshots each registered
/// root, diffs it against the previous snapshot and delivers the changes,
/// in path order, to every listener. Listeners added at any time first
/// receive the current state of every root as bootstrap events.
///
/// All methods take `&self`; wrap the watcher in an `Arc` to share it
/// between threads.
pub struct FileSystemWatcher {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl FileSystemWatcher {
    /// Create a watcher with the given configuration.
    pub fn new(config: WatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: WatcherConfig) -> Self {
        let scanner = Scanner::new(config.snapshotter(), config.diff_options());
        Self {
            shared: Arc::new(Shared {
                config,
                roots: RootRegistry::new(),
                listeners: ListenerRegistry::new(),
                scanner,
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &WatcherConfig {
        &self.shared.config
    }

    /// Register a root directory.
    ///
    /// Relative paths are resolved against the current directory. Returns
    /// `false` if the root was already registered. The root does not have
    /// to exist yet; a missing root simply has no entries.
    pub fn add_path(&self, root: impl AsRef<Path>) -> Result<bool> {
        let root = root.as_ref();
        let added = self.shared.roots.add(root)?;
        if added {
            info!("Watching {}", root.display());
        }
        Ok(added)
    }

    /// Deregister a root directory.
    ///
    /// Its snapshot is discarded on the next pass and no further events
    /// are emitted for it.
    pub fn remove_path(&self, root: impl AsRef<Path>) -> Result<bool> {
        let root = root.as_ref();
        let removed = self.shared.roots.remove(root)?;
        if removed {
            info!("Stopped watching {}", root.display());
        }
        Ok(removed)
    }

    /// Watched roots in path order.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.shared.roots.paths()
    }

    /// Register a listener.
    ///
    /// Before returning, the listener receives one `on_exists(.., None)`
    /// for every entry currently known under every root.
    pub fn add_listener(&self, listener: Arc<dyn WatcherListener>) -> ListenerId {
        self.shared
            .scanner
            .register(&self.shared.roots, &self.shared.listeners, listener)
    }

    /// Remove a listener; returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let removed = self.shared.listeners.remove(id);
        if removed {
            debug!("Removed {}", id);
        }
        removed
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.shared.listeners.len()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WatcherState {
        match *self.lifecycle.lock() {
            Lifecycle::Idle => WatcherState::Idle,
            Lifecycle::Running { .. } => WatcherState::Running,
            Lifecycle::Stopped => WatcherState::Stopped,
        }
    }

    /// Start the background scan loop.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Running { .. } => return Err(WatchError::AlreadyRunning),
            Lifecycle::Stopped => return Err(WatchError::Stopped),
            Lifecycle::Idle => {}
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("treewatch-scan".to_string())
            .spawn(move || run_loop(shared, stop_rx))
            .map_err(WatchError::Spawn)?;

        *lifecycle = Lifecycle::Running { stop_tx, handle };
        info!(
            "Watcher started (poll interval: {:?})",
            self.shared.config.poll_interval()
        );
        Ok(())
    }

    /// Stop the background scan loop.
    ///
    /// Waits for the in-flight pass to finish. When called from a listener
    /// callback on the scan thread itself, the loop exits after the current
    /// pass without being joined. Must not be called from a listener during
    /// an `add_listener` bootstrap; that join never returns.
    pub fn stop(&self) -> Result<()> {
        let (stop_tx, handle) = {
            let mut lifecycle = self.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running { stop_tx, handle } => (stop_tx, handle),
                Lifecycle::Idle => {
                    *lifecycle = Lifecycle::Idle;
                    return Err(WatchError::NotRunning);
                }
                Lifecycle::Stopped => return Err(WatchError::Stopped),
            }
        };

        // The loop may already be gone if its receiver was dropped
        let _ = stop_tx.send(());
        if handle.thread().id() != thread::current().id() && handle.join().is_err() {
            error!("Scan thread terminated abnormally");
        }

        info!("Watcher stopped");
        Ok(())
    }

    /// Run one pass synchronously on the calling thread.
    ///
    /// Serialized with the background loop; never overlaps a running pass.
    pub fn scan_now(&self) -> Result<()> {
        if self.state() == WatcherState::Stopped {
            return Err(WatchError::Stopped);
        }
        self.shared.run_pass();
        Ok(())
    }
}

impl Default for FileSystemWatcher {
    fn default() -> Self {
        Self::build(WatcherConfig::default())
    }
}

impl Drop for FileSystemWatcher {
    fn drop(&mut self) {
        if matches!(*self.lifecycle.get_mut(), Lifecycle::Running { .. }) {
            let _ = self.stop();
        }
    }
}

/// Background loop: pass, sleep, repeat until stopped.
fn run_loop(shared: Arc<Shared>, stop_rx: Receiver<()>) {
    let interval = shared.config.poll_interval();
    debug!("Scan loop running");

    loop {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| shared.run_pass())) {
            error!("Scan pass panicked: {}", panic_message(payload.as_ref()));
        }

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Scan loop exited");
}
