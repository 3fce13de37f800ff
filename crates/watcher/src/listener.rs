//! Listener registration and event dispatch

use crate::event::WatchEvent;
use anyhow::anyhow;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;
use treewatch_core::{Change, ChangeKind};

/// Receiver of watch events
///
/// Callbacks run on the scan thread (or on the caller of `add_listener`
/// during bootstrap) while the engine holds its scan lock. They must not
/// call `add_listener` or `scan_now` on the same engine. `stop` is only
/// safe from the scan thread: during a bootstrap on another thread it
/// deadlocks, joining a scan thread that waits for the lock the caller
/// holds. Errors and panics are caught and logged; they never reach other
/// listeners.
pub trait WatcherListener: Send + Sync {
    /// A path exists
    ///
    /// `modified` is `None` on a first sighting with no baseline,
    /// `Some(false)` for a new entry under a known directory, and
    /// `Some(true)` when a file's mtime changed since the last tick.
    fn on_exists(&self, root: &Path, relative: &str, modified: Option<bool>) -> anyhow::Result<()>;

    /// A path was removed
    fn on_removed(&self, root: &Path, relative: &str) -> anyhow::Result<()>;
}

/// Handle returned by `add_listener`, used to remove the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type ListenerList = Vec<(ListenerId, Arc<dyn WatcherListener>)>;

/// Copy-on-write set of listeners
///
/// Dispatch clones the current `Arc` and iterates it without holding the
/// lock, so registration never waits for delivery.
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Arc<ListenerList>>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub(crate) fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn insert(&self, id: ListenerId, listener: Arc<dyn WatcherListener>) {
        let mut guard = self.listeners.write();
        let mut next = ListenerList::clone(&guard);
        next.push((id, listener));
        *guard = Arc::new(next);
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut guard = self.listeners.write();
        if !guard.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        let next: ListenerList = guard
            .iter()
            .filter(|(existing, _)| *existing != id)
            .cloned()
            .collect();
        *guard = Arc::new(next);
        true
    }

    pub(crate) fn current(&self) -> Arc<ListenerList> {
        Arc::clone(&self.listeners.read())
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }
}

/// Deliver changes for one root to every listener, in path order
pub(crate) fn dispatch(
    listeners: &[(ListenerId, Arc<dyn WatcherListener>)],
    root: &Path,
    changes: &[Change],
) {
    for change in changes {
        for (id, listener) in listeners {
            deliver(*id, listener.as_ref(), root, change);
        }
    }
}

/// Deliver one change to one listener, isolating failures
///
/// Returns false if the listener returned an error or panicked.
pub(crate) fn deliver(
    id: ListenerId,
    listener: &dyn WatcherListener,
    root: &Path,
    change: &Change,
) -> bool {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match change.kind {
        ChangeKind::Added { parent_known } => {
            listener.on_exists(root, &change.path, parent_known.then_some(false))
        }
        ChangeKind::Modified(modified) => listener.on_exists(root, &change.path, Some(modified)),
        ChangeKind::Removed => listener.on_removed(root, &change.path),
    }));

    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!("{} failed on {}/{}: {:#}", id, root.display(), change.path, e);
            false
        }
        Err(payload) => {
            warn!(
                "{} panicked on {}/{}: {}",
                id,
                root.display(),
                change.path,
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Listener that forwards every event into a channel
///
/// Gives each consumer its own queue so slow processing happens off the
/// scan thread.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: Sender<WatchEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its queue
    pub fn new() -> (Self, Receiver<WatchEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    fn send(&self, event: WatchEvent) -> anyhow::Result<()> {
        self.tx
            .send(event)
            .map_err(|_| anyhow!("event receiver dropped"))
    }
}

impl WatcherListener for ChannelListener {
    fn on_exists(&self, root: &Path, relative: &str, modified: Option<bool>) -> anyhow::Result<()> {
        self.send(WatchEvent::exists(root, relative, modified))
    }

    fn on_removed(&self, root: &Path, relative: &str) -> anyhow::Result<()> {
        self.send(WatchEvent::removed(root, relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl WatcherListener for Recorder {
        fn on_exists(&self, _root: &Path, relative: &str, modified: Option<bool>) -> anyhow::Result<()> {
            self.seen.lock().push(format!("{relative}={modified:?}"));
            Ok(())
        }

        fn on_removed(&self, _root: &Path, relative: &str) -> anyhow::Result<()> {
            self.seen.lock().push(format!("{relative}=removed"));
            Ok(())
        }
    }

    struct Failing;

    impl WatcherListener for Failing {
        fn on_exists(&self, _root: &Path, _relative: &str, _modified: Option<bool>) -> anyhow::Result<()> {
            anyhow::bail!("listener refused")
        }

        fn on_removed(&self, _root: &Path, _relative: &str) -> anyhow::Result<()> {
            panic!("listener exploded")
        }
    }

    fn change(path: &str, kind: ChangeKind) -> Change {
        Change {
            path: path.to_string(),
            kind,
        }
    }

    #[test]
    fn test_change_kinds_map_to_callbacks() {
        let recorder = Recorder::default();
        let root = Path::new("/base");
        let id = ListenerId(1);

        deliver(id, &recorder, root, &change("a", ChangeKind::Added { parent_known: false }));
        deliver(id, &recorder, root, &change("b", ChangeKind::Added { parent_known: true }));
        deliver(id, &recorder, root, &change("c", ChangeKind::Modified(true)));
        deliver(id, &recorder, root, &change("d", ChangeKind::Modified(false)));
        deliver(id, &recorder, root, &change("e", ChangeKind::Removed));

        assert_eq!(
            *recorder.seen.lock(),
            vec!["a=None", "b=Some(false)", "c=Some(true)", "d=Some(false)", "e=removed"]
        );
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let registry = ListenerRegistry::new();
        let recorder = Arc::new(Recorder::default());

        registry.insert(registry.next_id(), Arc::new(Failing));
        registry.insert(registry.next_id(), recorder.clone());

        let changes = vec![
            change("x", ChangeKind::Modified(true)),
            change("y", ChangeKind::Removed),
        ];
        dispatch(&registry.current(), Path::new("/base"), &changes);

        assert_eq!(*recorder.seen.lock(), vec!["x=Some(true)", "y=removed"]);
    }

    #[test]
    fn test_remove_keeps_inflight_list() {
        let registry = ListenerRegistry::new();
        let id = registry.next_id();
        registry.insert(id, Arc::new(Recorder::default()));

        let inflight = registry.current();
        assert!(registry.remove(id));
        assert!(!registry.remove(id));

        assert_eq!(inflight.len(), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_channel_listener_forwards_events() {
        let (listener, rx) = ChannelListener::new();
        let root = Path::new("/base");

        listener.on_exists(root, "dir1", None).unwrap();
        listener.on_removed(root, "dir1").unwrap();

        assert_eq!(rx.try_recv().unwrap().kind, EventKind::Exists { modified: None });
        assert_eq!(rx.try_recv().unwrap(), WatchEvent::removed(root, "dir1"));
    }

    #[test]
    fn test_channel_listener_reports_dropped_receiver() {
        let (listener, rx) = ChannelListener::new();
        drop(rx);
        assert!(listener.on_removed(Path::new("/base"), "gone").is_err());
    }
}
