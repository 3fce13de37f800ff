//! Watcher configuration
//!
//! Loaded from TOML; every key is optional and falls back to its default.

use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use treewatch_core::{DiffOptions, IgnoreConfig, IgnoreRules, SnapshotOptions, Snapshotter};

/// Valid range for `poll_interval_ms`
const POLL_INTERVAL_RANGE_MS: std::ops::RangeInclusive<u64> = 1..=60_000;

/// Example configuration printed by `tw config example`
pub const EXAMPLE_CONFIG: &str = r#"# treewatch configuration

# Scan cadence in milliseconds. Lower values notice changes sooner at the
# cost of more CPU spent walking the tree. Valid: 1-60000.
poll_interval_ms = 50

# Follow symbolic links while walking.
follow_symlinks = false

# Deliver `modified: false` for every unchanged entry on every tick.
report_unchanged = false

# Honour each root's .gitignore.
use_gitignore = false

# Gitignore-style patterns relative to each root.
exclude = ["*.swp", "target/"]
"#;

/// Configuration for a [`FileSystemWatcher`](crate::FileSystemWatcher)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Scan cadence in milliseconds (default: 50)
    pub poll_interval_ms: u64,

    /// Follow symbolic links during the walk (default: false)
    pub follow_symlinks: bool,

    /// Emit `Modified(false)` for unchanged entries on every tick (default: false)
    pub report_unchanged: bool,

    /// Honour the root's `.gitignore` (default: false)
    pub use_gitignore: bool,

    /// Gitignore-style exclude patterns
    pub exclude: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            follow_symlinks: false,
            report_unchanged: false,
            use_gitignore: false,
            exclude: Vec::new(),
        }
    }
}

impl WatcherConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Add an exclude pattern
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    /// Enable reporting of unchanged entries
    pub fn report_unchanged(mut self) -> Self {
        self.report_unchanged = true;
        self
    }

    /// Get the poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate ranges and patterns
    pub fn validate(&self) -> Result<()> {
        if !POLL_INTERVAL_RANGE_MS.contains(&self.poll_interval_ms) {
            return Err(WatchError::Config(format!(
                "poll_interval_ms must be between {} and {}, got {}",
                POLL_INTERVAL_RANGE_MS.start(),
                POLL_INTERVAL_RANGE_MS.end(),
                self.poll_interval_ms
            )));
        }

        IgnoreRules::check_patterns(&self.exclude)
            .map_err(|e| WatchError::Config(format!("invalid exclude pattern: {e}")))?;

        Ok(())
    }

    /// Snapshotter configured with this config's walk and exclude options
    pub fn snapshotter(&self) -> Snapshotter {
        Snapshotter::new(SnapshotOptions {
            follow_symlinks: self.follow_symlinks,
            ignore: IgnoreConfig {
                use_gitignore: self.use_gitignore,
                patterns: self.exclude.clone(),
            },
        })
    }

    pub(crate) fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            report_unchanged: self.report_unchanged,
        }
    }
}
