//! Configuration schema for cvmfs-volume
//!
//! Configuration is read from `config.toml`; see [`ConfigManager`](super::ConfigManager)
//! for the search order.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Repository mount settings
    pub mount: MountConfig,

    /// Volume plugin settings
    pub plugin: PluginConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Where repositories are mounted and how their config is generated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Root under which `<repo>/<tag>` mount paths are created
    pub mountpoint: PathBuf,

    /// Directory receiving the generated `<repo>-<tag>` config files
    pub config_dir: PathBuf,

    /// Root under which `<repo>/<tag>` cache directories are created
    pub cache_root: PathBuf,

    /// Base config files concatenated, in order, into every generated config
    pub base_configs: Vec<PathBuf>,

    /// Owner of the shared cache directory (None leaves ownership alone)
    pub service_uid: Option<u32>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            mountpoint: PathBuf::from("/cvmfs"),
            config_dir: PathBuf::from("/etc/cvmfs"),
            cache_root: PathBuf::from("/var/cache"),
            base_configs: vec![
                PathBuf::from("/etc/cvmfs/default.conf"),
                PathBuf::from("/etc/cvmfs/default.local"),
                PathBuf::from("/etc/cvmfs/domain.d/cern.ch.conf"),
            ],
            service_uid: Some(995),
        }
    }
}

/// Docker volume plugin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Unix socket the plugin listens on
    pub socket: PathBuf,

    /// Registry snapshot location (defaults to `<mountpoint>/docker.cache`)
    pub state_file: Option<PathBuf>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from("/run/docker/plugins/cvmfs.sock"),
            state_file: None,
        }
    }
}

impl Config {
    /// Effective registry snapshot path
    pub fn state_file(&self) -> PathBuf {
        self.plugin
            .state_file
            .clone()
            .unwrap_or_else(|| self.mount.mountpoint.join("docker.cache"))
    }
}
