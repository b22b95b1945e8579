//! Configuration management for cvmfs-volume

pub mod schema;

pub use schema::{Config, MountConfig, PluginConfig};

use crate::error::{VolumeError, VolumeResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Name of the directory holding the config file
const APP_DIR: &str = "cvmfs-volume";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
    explicit: bool,
}

impl ConfigManager {
    /// Create a config manager that searches the default locations
    pub fn new() -> Self {
        let config_path = Self::search_paths()
            .into_iter()
            .find(|p| p.exists())
            .unwrap_or_else(Self::default_config_path);
        Self {
            config_path,
            explicit: false,
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            explicit: true,
        }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Locations searched, in order, when no path is given
    pub fn search_paths() -> Vec<PathBuf> {
        vec![
            Self::default_config_path(),
            PathBuf::from("/etc").join(APP_DIR).join("config.toml"),
            PathBuf::from("config.toml"),
        ]
    }

    /// Load configuration, falling back to defaults if no file exists
    pub async fn load(&self) -> VolumeResult<Config> {
        if !self.config_path.exists() {
            if self.explicit {
                return Err(VolumeError::ConfigNotFound(self.config_path.clone()));
            }
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!("using config file: {}", self.config_path.display());
        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> VolumeResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| VolumeError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| VolumeError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
