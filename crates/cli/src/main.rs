//! treewatch CLI - tw command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// treewatch - Polling change watcher for directory trees
#[derive(Parser)]
#[command(name = "tw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch one or more directory trees and print changes until Ctrl-C
    Watch {
        /// Root directories to watch
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the scan cadence in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Extra gitignore-style exclude pattern (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Print one JSON object per event
        #[arg(long)]
        json: bool,
    },
    /// Print a single snapshot of a directory tree
    Snapshot {
        /// Root directory
        root: PathBuf,

        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration helpers
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print an example config file
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Events go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            roots,
            config,
            poll_interval_ms,
            exclude,
            json,
        } => {
            let options = cmd::watch::WatchOptions {
                roots,
                config,
                poll_interval_ms,
                exclude,
                json,
            };
            cmd::watch::run(options).await
        }
        Commands::Snapshot { root, config, json } => {
            cmd::snapshot::run(&root, config.as_deref(), json)
        }
        Commands::Config(ConfigCommands::Example) => cmd::config::run_example(),
    }
}
