// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use rearcam::config::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "rearcam")]
#[command(about = "Rear camera preview with live capture metadata")]
#[command(version = rearcam::constants::app_version())]
struct Cli {
    /// Configuration file (default: <config dir>/rearcam/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Preview the rear camera and print capture metadata per frame
    Preview {
        /// Stop after this many metadata snapshots (default: until Ctrl+C)
        #[arg(short, long)]
        frames: Option<usize>,

        /// Answer the camera permission request with "deny"
        #[arg(long)]
        deny_permission: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=rearcam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::List => cli::list_cameras(&config),
        Commands::Preview {
            frames,
            deny_permission,
        } => cli::run_preview(&config, frames, deny_permission),
    }
}
