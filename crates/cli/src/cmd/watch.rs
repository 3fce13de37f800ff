//! Watch roots and print changes until Ctrl-C

use crate::output;
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use treewatch_watcher::{ChannelListener, FileSystemWatcher};

/// Arguments of `tw watch`
pub struct WatchOptions {
    pub roots: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
    pub exclude: Vec<String>,
    pub json: bool,
}

pub async fn run(options: WatchOptions) -> Result<()> {
    let config = super::config::load(options.config.as_deref())?;
    let config = super::config::apply_overrides(config, options.poll_interval_ms, options.exclude)?;

    let watcher = FileSystemWatcher::new(config).context("Failed to create watcher")?;
    for root in &options.roots {
        if !root.is_dir() {
            warn!("{} is not a directory yet; watching for it", root.display());
        }
        watcher
            .add_path(root)
            .with_context(|| format!("Failed to watch {}", root.display()))?;
    }
    watcher.start().context("Failed to start watcher")?;

    // Printing happens off the scan thread; the queue closes when the
    // watcher (and with it the listener) is dropped
    let (listener, rx) = ChannelListener::new();
    let json = options.json;
    let printer = tokio::task::spawn_blocking(move || -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for event in rx {
            output::write_event(&mut out, &event, json)?;
            out.flush()?;
        }
        Ok(())
    });

    watcher.add_listener(Arc::new(listener));
    info!("Press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    watcher.stop().context("Failed to stop watcher")?;
    drop(watcher);

    match printer.await.context("Printer task failed")? {
        Ok(()) => Ok(()),
        // Downstream pipe closed (e.g. `tw watch . | head`)
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(e).context("Failed to write events"),
    }
}
