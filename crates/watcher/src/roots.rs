//! Registry of watched root directories

use crate::error::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one registration of a root
///
/// Removing and re-adding the same path yields a new id, which is how the
/// scanner knows to start that root over from an empty baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct RootId(u64);

/// Thread-safe set of watched roots
///
/// Mutations take a short write lock and never wait for a scan pass.
pub(crate) struct RootRegistry {
    next_id: AtomicU64,
    roots: RwLock<BTreeMap<PathBuf, RootId>>,
}

impl RootRegistry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            roots: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a root; returns false if it was already registered
    pub(crate) fn add(&self, root: &Path) -> Result<bool> {
        let root = normalize(root)?;
        let mut roots = self.roots.write();
        if roots.contains_key(&root) {
            return Ok(false);
        }
        let id = RootId(self.next_id.fetch_add(1, Ordering::Relaxed));
        roots.insert(root, id);
        Ok(true)
    }

    /// Deregister a root; returns false if it was not registered
    pub(crate) fn remove(&self, root: &Path) -> Result<bool> {
        let root = normalize(root)?;
        Ok(self.roots.write().remove(&root).is_some())
    }

    /// Current registrations in path order
    pub(crate) fn list(&self) -> Vec<(PathBuf, RootId)> {
        self.roots
            .read()
            .iter()
            .map(|(path, id)| (path.clone(), *id))
            .collect()
    }

    pub(crate) fn paths(&self) -> Vec<PathBuf> {
        self.roots.read().keys().cloned().collect()
    }
}

/// Make a root absolute against the current directory, then resolve `.`
/// and `..` lexically so one directory has one spelling
fn normalize(root: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(root)?;

    let mut clean = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            // `pop` never removes the root or prefix component
            Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other),
        }
    }
    Ok(clean)
}
