//! Mount execution for cvmfs repositories
//!
//! The [`Mounter`] trait hides the host mount facility so the controller can
//! be exercised without mount privileges:
//! - [`SystemMounter`]: shells out to `mount -t cvmfs` / `umount`
//! - [`RecordingMounter`]: in-memory fake that counts invocations

pub mod artifact;
pub mod fake;
mod system;

pub use artifact::ConfigGenerator;
pub use fake::RecordingMounter;
pub use system::{SystemMounter, FUSE_SUPER_MAGIC};

use crate::error::VolumeResult;
use async_trait::async_trait;
use std::path::Path;

/// Host mount facility
#[async_trait]
pub trait Mounter: Send + Sync {
    /// Whether `path` is currently an active cvmfs (FUSE) mount
    async fn is_mounted(&self, path: &Path) -> std::io::Result<bool>;

    /// Mount `repo` at `target` using the generated config file
    async fn mount(&self, repo: &str, config: &Path, target: &Path) -> VolumeResult<()>;

    /// Unmount whatever is mounted at `target`; `repo` labels errors
    async fn unmount(&self, repo: &str, target: &Path) -> VolumeResult<()>;

    /// Bind-mount `source` onto `target`
    async fn bind(&self, source: &Path, target: &Path) -> VolumeResult<()>;

    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;
}
