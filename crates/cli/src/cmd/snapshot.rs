//! Print one snapshot of a directory tree

use crate::output;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(root: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let config = super::config::load(config)?;
    let snapshot = config.snapshotter().snapshot(root);

    if json {
        let text = serde_json::to_string_pretty(&snapshot).context("Failed to encode snapshot")?;
        println!("{}", text);
        return Ok(());
    }

    if !snapshot.root_exists() {
        println!("{} {}", root.display().to_string().cyan(), "(missing)".yellow());
        return Ok(());
    }

    println!("{}", root.display().to_string().cyan().bold());
    for (path, state) in snapshot.iter() {
        println!("{}", output::format_entry(path, state));
    }
    for path in snapshot.unreadable() {
        println!("  {} {}", path, "(unreadable)".red());
    }
    println!();
    println!("{} entries", snapshot.len());

    Ok(())
}
