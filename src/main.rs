//! cvmfs-volume - CernVM-FS volume plugin and flexvolume driver
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use cvmfs_volume::cli::commands;
use cvmfs_volume::cli::{Cli, Commands};
use cvmfs_volume::config::{Config, ConfigManager};
use cvmfs_volume::error::VolumeResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> VolumeResult<()> {
    let cli = Cli::parse();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("configuration from {}", manager.path().display());

    if let Some(mountpoint) = cli.mountpoint {
        config.mount.mountpoint = mountpoint;
    }
    if let Some(socket) = cli.socket {
        config.plugin.socket = socket;
    }

    match cli.command {
        None | Some(Commands::Serve) => commands::serve(&config).await,
        Some(Commands::Init) => commands::flex::init(&config),
        Some(Commands::Attach { options, .. }) => {
            commands::flex::attach(&config, options.as_deref()).await
        }
        Some(Commands::Detach { volume, .. }) => {
            commands::flex::detach(&config, volume.as_deref()).await
        }
        Some(Commands::Mount {
            mount_dir, device, ..
        }) => commands::flex::mount(&config, mount_dir.as_deref(), device.as_deref()).await,
        Some(Commands::Unmount { mount_dir }) => {
            commands::flex::unmount(&config, mount_dir.as_deref()).await
        }
        Some(Commands::List { format }) => commands::list(format, &config).await,
        Some(Commands::Config { action }) => commands::config(action, &config, &manager),
    }
}

/// Logs go to stderr; stdout carries protocol output.
/// 0 = warn, 1 = info, 2+ = debug; RUST_LOG takes precedence.
fn init_logging(verbose: u8, config: &Config) {
    let level = match verbose {
        0 => "cvmfs_volume=warn",
        1 => "cvmfs_volume=info",
        _ => "cvmfs_volume=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }
}
