//! Scan passes: snapshot, diff and dispatch for every watched root

use crate::listener::{deliver, dispatch, ListenerId, ListenerRegistry, WatcherListener};
use crate::roots::{RootId, RootRegistry};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use treewatch_core::{bootstrap, diff_with, DiffOptions, Snapshot, Snapshotter};

/// Summary of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PassStats {
    pub roots: usize,
    pub changes: usize,
}

/// Last known snapshot per root registration
#[derive(Default)]
struct ScanState {
    snapshots: BTreeMap<PathBuf, (RootId, Snapshot)>,
    passes: u64,
}

impl ScanState {
    /// Drop snapshots for roots that were removed or re-registered
    fn retain_registered(&mut self, registered: &[(PathBuf, RootId)]) {
        let live: BTreeMap<&Path, RootId> = registered
            .iter()
            .map(|(path, id)| (path.as_path(), *id))
            .collect();

        self.snapshots.retain(|path, (id, _)| {
            let keep = live.get(path.as_path()) == Some(&*id);
            if !keep {
                debug!("Discarding snapshot for unwatched root {}", path.display());
            }
            keep
        });
    }

    fn previous(&self, root: &Path, id: RootId) -> Option<&Snapshot> {
        self.snapshots
            .get(root)
            .filter(|(stored, _)| *stored == id)
            .map(|(_, snapshot)| snapshot)
    }
}

/// Drives snapshot + diff + dispatch under a single scan lock
///
/// Holding the lock for a whole pass keeps passes from overlapping and lets
/// a bootstrap see a consistent set of snapshots.
pub(crate) struct Scanner {
    snapshotter: Snapshotter,
    diff_options: DiffOptions,
    state: Mutex<ScanState>,
}

impl Scanner {
    pub(crate) fn new(snapshotter: Snapshotter, diff_options: DiffOptions) -> Self {
        Self {
            snapshotter,
            diff_options,
            state: Mutex::new(ScanState::default()),
        }
    }

    /// Run one pass over every registered root
    pub(crate) fn run_pass(&self, roots: &RootRegistry, listeners: &ListenerRegistry) -> PassStats {
        let mut state = self.state.lock();
        let registered = roots.list();
        state.retain_registered(&registered);

        let mut stats = PassStats {
            roots: registered.len(),
            changes: 0,
        };
        for (root, id) in &registered {
            let current = listeners.current();
            stats.changes += self.scan_root(&mut state, &current, root, *id);
        }

        state.passes += 1;
        if stats.changes > 0 {
            debug!(
                "Pass {}: {} changes across {} roots",
                state.passes, stats.changes, stats.roots
            );
        }
        stats
    }

    /// Register a listener, replaying current state to it first
    ///
    /// Roots that have never been scanned are scanned now so the replay is
    /// complete; their first-sighting events also go to the listeners that
    /// were already registered.
    pub(crate) fn register(
        &self,
        roots: &RootRegistry,
        listeners: &ListenerRegistry,
        listener: Arc<dyn WatcherListener>,
    ) -> ListenerId {
        let mut state = self.state.lock();
        let registered = roots.list();
        state.retain_registered(&registered);

        let existing = listeners.current();
        for (root, root_id) in &registered {
            if state.previous(root, *root_id).is_none() {
                self.scan_root(&mut state, &existing, root, *root_id);
            }
        }

        let id = listeners.next_id();
        let mut replayed = 0;
        for (root, root_id) in &registered {
            let Some(snapshot) = state.previous(root, *root_id) else {
                continue;
            };
            for change in bootstrap(snapshot) {
                deliver(id, listener.as_ref(), root, &change);
                replayed += 1;
            }
        }

        listeners.insert(id, listener);
        debug!("Registered {} with {} bootstrap events", id, replayed);
        id
    }

    fn scan_root(
        &self,
        state: &mut ScanState,
        listeners: &[(ListenerId, Arc<dyn WatcherListener>)],
        root: &Path,
        id: RootId,
    ) -> usize {
        let mut current = self.snapshotter.snapshot(root);

        let empty = Snapshot::missing();
        let previous = state.previous(root, id).unwrap_or(&empty);
        current.carry_forward(previous);
        let changes = diff_with(previous, &current, self.diff_options);

        dispatch(listeners, root, &changes);
        state.snapshots.insert(root.to_path_buf(), (id, current));
        changes.len()
    }
}
