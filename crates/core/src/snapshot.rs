//! Recursive tree snapshots for a watched root

use crate::entry::EntryState;
use crate::ignore::{IgnoreConfig, IgnoreRules};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Complete picture of one root's tree at a point in time
///
/// Keys are paths relative to the root, joined with `/`, so iteration
/// order is plain string order and a directory precedes its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Whether the root directory itself was present
    root_exists: bool,
    /// Entries keyed by relative path
    entries: BTreeMap<String, EntryState>,
    /// Directories whose listing failed during this snapshot
    unreadable: BTreeSet<String>,
}

impl Snapshot {
    /// Create an empty snapshot of an existing root
    pub fn new() -> Self {
        Self {
            root_exists: true,
            ..Self::default()
        }
    }

    /// Snapshot of a root that is missing or unreadable
    pub fn missing() -> Self {
        Self::default()
    }

    /// Whether the root directory existed
    pub fn root_exists(&self) -> bool {
        self.root_exists
    }

    /// Insert an entry
    pub fn insert(&mut self, path: impl Into<String>, state: EntryState) {
        self.entries.insert(path.into(), state);
    }

    /// Look up an entry
    pub fn get(&self, path: &str) -> Option<&EntryState> {
        self.entries.get(path)
    }

    /// Check if a path is present
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterate over entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryState)> {
        self.entries.iter().map(|(path, state)| (path.as_str(), state))
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a directory whose children could not be listed
    pub fn mark_unreadable(&mut self, path: impl Into<String>) {
        self.unreadable.insert(path.into());
    }

    /// Directories whose children could not be listed
    pub fn unreadable(&self) -> impl Iterator<Item = &str> {
        self.unreadable.iter().map(String::as_str)
    }

    /// Copy entries beneath unreadable directories from `previous`
    ///
    /// Keeps a transient listing failure from looking like the removal of
    /// everything below that directory.
    pub fn carry_forward(&mut self, previous: &Snapshot) {
        if self.unreadable.is_empty() {
            return;
        }

        let mut carried = Vec::new();
        for dir in &self.unreadable {
            let prefix = format!("{dir}/");
            for (path, state) in previous.entries.range(prefix.clone()..) {
                if !path.starts_with(&prefix) {
                    break;
                }
                if !self.entries.contains_key(path) {
                    carried.push((path.clone(), *state));
                }
            }
        }

        if !carried.is_empty() {
            debug!("Carried forward {} entries beneath unreadable directories", carried.len());
        }
        self.entries.extend(carried);
    }
}

/// Options controlling how a root is walked
#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    /// Follow symbolic links (default: false)
    pub follow_symlinks: bool,
    /// Exclude rules
    pub ignore: IgnoreConfig,
}

/// Walks roots and produces snapshots
#[derive(Debug, Clone, Default)]
pub struct Snapshotter {
    options: SnapshotOptions,
}

impl Snapshotter {
    /// Create a snapshotter with the given options
    pub fn new(options: SnapshotOptions) -> Self {
        Self { options }
    }

    /// Snapshot a root
    ///
    /// Never fails: a missing or unreadable root yields an empty snapshot,
    /// and entries that error mid-walk are skipped for this pass.
    pub fn snapshot(&self, root: &Path) -> Snapshot {
        match fs::metadata(root) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                debug!("Root is not a directory: {}", root.display());
                return Snapshot::missing();
            }
            Err(e) => {
                debug!("Root unavailable: {}: {}", root.display(), e);
                return Snapshot::missing();
            }
        }

        let rules = self.load_rules(root);
        let mut snapshot = Snapshot::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(self.options.follow_symlinks)
            .into_iter()
            .filter_entry(|entry| {
                // Keys must round-trip to real paths; prune names that are not UTF-8
                if entry.file_name().to_str().is_none() {
                    debug!("Skipping non-UTF-8 name: {}", entry.path().display());
                    return false;
                }
                match (&rules, entry.path().strip_prefix(root)) {
                    (Some(rules), Ok(relative)) => {
                        !rules.should_ignore(relative, entry.file_type().is_dir())
                    }
                    _ => true,
                }
            });

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    if err.depth() == 0 {
                        debug!("Root unreadable: {}: {}", root.display(), err);
                        return Snapshot::missing();
                    }
                    let key = err.path().and_then(|path| relative_key(root, path));
                    match key {
                        Some(key) if snapshot.get(&key).is_some_and(EntryState::is_dir) => {
                            debug!("Directory unreadable, keeping previous state: {}", key);
                            snapshot.mark_unreadable(key);
                        }
                        _ => debug!("Skipping entry under {}: {}", root.display(), err),
                    }
                    continue;
                }
            };

            let Some(key) = relative_key(root, entry.path()) else {
                continue;
            };

            match entry.metadata() {
                Ok(metadata) => snapshot.insert(key, EntryState::from_metadata(&metadata)),
                Err(e) => debug!("Skipping {}: {}", key, e),
            }
        }

        snapshot
    }

    fn load_rules(&self, root: &Path) -> Option<IgnoreRules> {
        if !self.options.ignore.is_active() {
            return None;
        }

        match IgnoreRules::load(root, &self.options.ignore) {
            Ok(rules) => Some(rules),
            Err(e) => {
                warn!("Ignoring exclude rules for {}: {}", root.display(), e);
                None
            }
        }
    }
}

/// Convert a path under `root` into a `/`-joined relative key
///
/// `None` for the root itself, paths outside it, and non-UTF-8 names.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let mut key = String::new();
    for component in relative.components() {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(component.as_os_str().to_str()?);
    }

    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("dir1")).unwrap();
        fs::create_dir_all(root.join("dir2")).unwrap();
        fs::write(root.join("dir1/file11"), b"").unwrap();
        fs::write(root.join("dir1/file12"), b"").unwrap();
        fs::write(root.join("dir2/file20"), b"").unwrap();
    }

    #[test]
    fn test_snapshot_is_recursive_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        build_tree(temp_dir.path());

        let snapshot = Snapshotter::default().snapshot(temp_dir.path());
        let paths: Vec<&str> = snapshot.iter().map(|(path, _)| path).collect();

        assert!(snapshot.root_exists());
        assert_eq!(
            paths,
            vec!["dir1", "dir1/file11", "dir1/file12", "dir2", "dir2/file20"]
        );
    }

    #[test]
    fn test_directories_have_no_mtime() {
        let temp_dir = TempDir::new().unwrap();
        build_tree(temp_dir.path());

        let snapshot = Snapshotter::default().snapshot(temp_dir.path());

        let dir = snapshot.get("dir1").unwrap();
        assert_eq!(dir.kind, EntryKind::Directory);
        assert_eq!(dir.modified, None);

        let file = snapshot.get("dir1/file11").unwrap();
        assert_eq!(file.kind, EntryKind::File);
        assert!(file.modified.is_some());
    }

    #[test]
    fn test_records_file_mtime() {
        use filetime::{set_file_mtime, FileTime};

        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("old.txt");
        fs::write(&file, b"old").unwrap();

        let stamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_500_000_000);
        set_file_mtime(&file, FileTime::from_system_time(stamp)).unwrap();

        let snapshot = Snapshotter::default().snapshot(temp_dir.path());
        assert_eq!(snapshot.get("old.txt").unwrap().modified, Some(stamp));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = Snapshotter::default().snapshot(&temp_dir.path().join("nope"));

        assert!(!snapshot.root_exists());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_file_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain");
        fs::write(&file, b"x").unwrap();

        let snapshot = Snapshotter::default().snapshot(&file);
        assert!(!snapshot.root_exists());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_excluded_directories_are_pruned() {
        let temp_dir = TempDir::new().unwrap();
        build_tree(temp_dir.path());
        fs::create_dir_all(temp_dir.path().join("target/debug")).unwrap();
        fs::write(temp_dir.path().join("target/debug/app"), b"").unwrap();
        fs::write(temp_dir.path().join("dir1/notes.swp"), b"").unwrap();

        let snapshotter = Snapshotter::new(SnapshotOptions {
            follow_symlinks: false,
            ignore: IgnoreConfig {
                use_gitignore: false,
                patterns: vec!["target/".to_string(), "*.swp".to_string()],
            },
        });
        let snapshot = snapshotter.snapshot(temp_dir.path());

        assert!(!snapshot.contains("target"));
        assert!(!snapshot.contains("target/debug/app"));
        assert!(!snapshot.contains("dir1/notes.swp"));
        assert_eq!(snapshot.len(), 5);
    }

    #[test]
    fn test_carry_forward_restores_unreadable_subtree() {
        let mut previous = Snapshot::new();
        previous.insert("a", EntryState::directory());
        previous.insert("a/x", EntryState::file(None));
        previous.insert("a/y", EntryState::directory());
        previous.insert("a/y/z", EntryState::file(None));
        previous.insert("ab", EntryState::file(None));
        previous.insert("b", EntryState::file(None));

        let mut current = Snapshot::new();
        current.insert("a", EntryState::directory());
        current.mark_unreadable("a");

        current.carry_forward(&previous);

        let paths: Vec<&str> = current.iter().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["a", "a/x", "a/y", "a/y/z"]);
    }

    #[test]
    fn test_relative_key_uses_forward_slashes() {
        let root = Path::new("/base");
        assert_eq!(
            relative_key(root, &root.join("dir3").join("dir30").join("file301")),
            Some("dir3/dir30/file301".to_string())
        );
        assert_eq!(relative_key(root, root), None);
        assert_eq!(relative_key(root, Path::new("/elsewhere/file")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let bad_dir = temp_dir.path().join(OsStr::from_bytes(b"dir\xff"));
        // Some filesystems refuse non-UTF-8 names outright
        if fs::create_dir(&bad_dir).is_err() {
            return;
        }
        fs::write(bad_dir.join("inner"), b"").unwrap();
        fs::write(temp_dir.path().join(OsStr::from_bytes(b"file\xfe")), b"").unwrap();
        fs::write(temp_dir.path().join("plain"), b"").unwrap();

        let snapshot = Snapshotter::default().snapshot(temp_dir.path());
        let paths: Vec<&str> = snapshot.iter().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["plain"]);

        let root = Path::new("/base");
        assert_eq!(relative_key(root, &root.join(OsStr::from_bytes(b"x\xff"))), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_marked() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        build_tree(temp_dir.path());
        let locked = temp_dir.path().join("dir1");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let snapshot = Snapshotter::default().snapshot(temp_dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Root can bypass permission bits; only assert when the listing failed
        if !snapshot.contains("dir1/file11") {
            assert!(snapshot.contains("dir1"));
            assert_eq!(snapshot.unreadable().collect::<Vec<_>>(), vec!["dir1"]);
        }
    }
}
