//! Configuration helpers
//!
//! Loads the watcher config a command runs with and prints the example file.

use anyhow::{Context, Result};
use std::path::Path;
use treewatch_watcher::config::EXAMPLE_CONFIG;
use treewatch_watcher::WatcherConfig;

/// Print the example config to stdout
pub fn run_example() -> Result<()> {
    print!("{}", EXAMPLE_CONFIG);
    Ok(())
}

/// Load the config file if given, otherwise defaults
pub fn load(path: Option<&Path>) -> Result<WatcherConfig> {
    match path {
        Some(path) => WatcherConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(WatcherConfig::default()),
    }
}

/// Apply command-line overrides on top of a loaded config
pub fn apply_overrides(
    mut config: WatcherConfig,
    poll_interval_ms: Option<u64>,
    exclude: Vec<String>,
) -> Result<WatcherConfig> {
    if let Some(interval) = poll_interval_ms {
        config.poll_interval_ms = interval;
    }
    config.exclude.extend(exclude);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
