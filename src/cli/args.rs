//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cvmfs-volume - CernVM-FS volumes for containers
///
/// With no command given the Docker volume plugin starts and listens on its
/// Unix socket. The attach/detach/mount/unmount commands implement the
/// Kubernetes flexvolume calling convention.
#[derive(Parser, Debug)]
#[command(name = "cvmfs-volume")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute (defaults to serve)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CVMFS_VOLUME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root under which repositories are mounted
    #[arg(long, global = true)]
    pub mountpoint: Option<PathBuf>,

    /// Location of the plugin socket
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Docker volume plugin
    Serve,

    /// Initialize the flexvolume driver
    Init,

    /// Mount the repository described by the JSON options
    Attach {
        /// JSON options, e.g. {"repository":"alice.cern.ch"}
        options: Option<String>,

        /// Remaining kubelet arguments (node name)
        #[arg(hide = true)]
        extra: Vec<String>,
    },

    /// Unmount a repository volume
    Detach {
        /// Volume name (repo, repo@tag or repo#hash)
        volume: Option<String>,

        /// Remaining kubelet arguments (node name)
        #[arg(hide = true)]
        extra: Vec<String>,
    },

    /// Bind-mount an attached repository into a pod directory
    Mount {
        /// Directory to mount into
        mount_dir: Option<PathBuf>,

        /// Repository mount path returned by attach
        device: Option<PathBuf>,

        /// JSON options (ignored)
        options: Option<String>,
    },

    /// Unmount a pod directory
    Unmount {
        /// Directory to unmount
        mount_dir: Option<PathBuf>,
    },

    /// List registered volumes
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,

    /// Show configuration file path
    Path,
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
