//! Common utilities for watcher integration tests
#![allow(dead_code)]

use filetime::{set_file_mtime, FileTime};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};
use treewatch_watcher::WatcherListener;

/// Listener that keeps the last event per path plus a full log
#[derive(Default)]
pub struct Recorder {
    latest: Mutex<BTreeMap<String, String>>,
    log: Mutex<Vec<String>>,
}

impl Recorder {
    /// Last event per path, one `path=event` line each, in path order
    pub fn render(&self) -> String {
        self.latest
            .lock()
            .iter()
            .map(|(path, event)| format!("{path}={event}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every event received, in delivery order
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Forget the delivery log (the latest map is kept)
    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    fn record(&self, root: &Path, relative: &str, event: String) {
        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.log.lock().push(format!("{root_name}:{relative}={event}"));
        self.latest.lock().insert(relative.to_string(), event);
    }
}

impl WatcherListener for Recorder {
    fn on_exists(&self, root: &Path, relative: &str, modified: Option<bool>) -> anyhow::Result<()> {
        let flag = match modified {
            None => "null".to_string(),
            Some(flag) => flag.to_string(),
        };
        self.record(root, relative, format!("modified: {flag}"));
        Ok(())
    }

    fn on_removed(&self, root: &Path, relative: &str) -> anyhow::Result<()> {
        self.record(root, relative, "removed: true".to_string());
        Ok(())
    }
}

/// A fixed point in the past, so later writes always change the mtime
pub fn long_ago() -> SystemTime {
    SystemTime::now() - Duration::from_secs(3600)
}

/// Create an empty file with a backdated mtime
pub fn create_old_file(path: &Path) {
    fs::write(path, b"").unwrap();
    set_file_mtime(path, FileTime::from_system_time(long_ago())).unwrap();
}

/// Bump a file's mtime to now
pub fn touch(path: &Path) {
    fs::write(path, b"").unwrap();
    set_file_mtime(path, FileTime::from_system_time(SystemTime::now())).unwrap();
}

/// Build `dir1/{file11,file12}` and `dir2/file20` under `base`
pub fn build_initial_tree(base: &Path) {
    fs::create_dir(base.join("dir1")).unwrap();
    fs::create_dir(base.join("dir2")).unwrap();
    create_old_file(&base.join("dir1/file11"));
    create_old_file(&base.join("dir1/file12"));
    create_old_file(&base.join("dir2/file20"));
}

/// Poll `check` until it returns true or `timeout` passes
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}
