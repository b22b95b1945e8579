//! Error types for cvmfs-volume
//!
//! All modules use `VolumeResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cvmfs-volume operations
pub type VolumeResult<T> = Result<T, VolumeError>;

/// All errors that can occur while managing cvmfs volumes
#[derive(Error, Debug)]
pub enum VolumeError {
    // Request errors
    #[error("no repository given")]
    RepoNotFound,

    #[error("{0} volume not found")]
    VolumeNotFound(String),

    #[error("invalid volume name '{name}': {reason}")]
    InvalidVolumeName { name: String, reason: &'static str },

    // Mount errors
    #[error("repository '{repo}': failed to generate config :: {reason}")]
    ConfigGeneration { repo: String, reason: String },

    #[error("repository '{repo}': failed to create directory :: {}", path.display())]
    MountDir {
        repo: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("repository '{repo}': failed to check mount dir :: {}", path.display())]
    MountCheck {
        repo: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("repository '{repo}': failed to mount :: {detail}")]
    MountExec { repo: String, detail: String },

    #[error("repository '{repo}': failed to unmount :: {detail}")]
    UnmountExec { repo: String, detail: String },

    #[error("bind mount failed :: {}: {detail}", target.display())]
    BindMount { target: PathBuf, detail: String },

    // Registry errors
    #[error("Failed to persist volume registry {}: {source}", path.display())]
    RegistryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),


    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Plugin server errors
    #[error("Plugin server error: {0}")]
    Server(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl VolumeError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Repository the error refers to, if any
    pub fn repo(&self) -> Option<&str> {
        match self {
            Self::ConfigGeneration { repo, .. }
            | Self::MountDir { repo, .. }
            | Self::MountCheck { repo, .. }
            | Self::MountExec { repo, .. }
            | Self::UnmountExec { repo, .. } => Some(repo),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RepoNotFound | Self::InvalidVolumeName { .. } => {
                Some("Pass a repository such as: atlas.cern.ch@prod")
            }
            Self::ConfigGeneration { .. } => {
                Some("Check that the cvmfs client is installed and /etc/cvmfs is writable")
            }
            Self::MountExec { .. } => Some("Check that the repository exists and is reachable"),
            Self::CommandFailed { .. } => Some("mount/umount must be available and run as root"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = VolumeError::MountExec {
            repo: "alice.cern.ch".to_string(),
            detail: "exit status: 32".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "repository 'alice.cern.ch': failed to mount :: exit status: 32"
        );
    }

    #[test]
    fn error_repo() {
        let err = VolumeError::UnmountExec {
            repo: "atlas.cern.ch".to_string(),
            detail: String::new(),
        };
        assert_eq!(err.repo(), Some("atlas.cern.ch"));
        assert_eq!(VolumeError::RepoNotFound.repo(), None);
    }

    #[test]
    fn error_hint() {
        assert!(VolumeError::RepoNotFound.hint().is_some());
        assert!(VolumeError::VolumeNotFound("x".into()).hint().is_none());
    }
}
