//! Volume driver
//!
//! Implements the volume-plugin operations on top of the controller and the
//! registry. The controller lock is always taken (and released) before the
//! registry lock.

use crate::controller::RepoController;
use crate::error::VolumeResult;
use crate::registry::{MountRecord, VolumeRegistry};
use crate::volume::RepoId;
use std::path::PathBuf;
use tracing::{info, warn};

/// Scope reported to the container runtime
pub const SCOPE: &str = "local";

/// Reference-counted cvmfs volumes
pub struct VolumeDriver {
    controller: RepoController,
    registry: VolumeRegistry,
}

impl VolumeDriver {
    pub fn new(controller: RepoController, registry: VolumeRegistry) -> Self {
        Self {
            controller,
            registry,
        }
    }

    pub fn controller(&self) -> &RepoController {
        &self.controller
    }

    pub fn registry(&self) -> &VolumeRegistry {
        &self.registry
    }

    /// Make sure the volume is mounted and registered
    pub async fn create(&self, name: &str) -> VolumeResult<()> {
        let id = RepoId::parse(name)?;
        let volume_name = id.volume_name();
        info!("create {} :: {}", name, volume_name);

        let path = self.controller.mount_tag(&id).await?;
        if !self.registry.contains(&volume_name).await {
            self.registry.create(&volume_name, path).await?;
        }
        Ok(())
    }

    /// Attach one consumer, returning the mount path
    ///
    /// Registration and the count increment share one registry critical
    /// section, so a racing `remove` cannot make a successful mount report
    /// a missing volume.
    pub async fn mount(&self, name: &str) -> VolumeResult<PathBuf> {
        let id = RepoId::parse(name)?;
        let volume_name = id.volume_name();
        info!("mount {} :: {}", name, volume_name);

        let path = self.controller.mount_tag(&id).await?;
        Ok(self.registry.acquire(&volume_name, path).await?.path)
    }

    /// Detach one consumer; the repository stays mounted
    pub async fn unmount(&self, name: &str) -> VolumeResult<()> {
        let volume_name = RepoId::parse(name)?.volume_name();
        info!("unmount {} :: {}", name, volume_name);

        self.registry.adjust(&volume_name, -1).await?;
        Ok(())
    }

    /// Unmount the repository and forget the volume, whatever its reference count
    ///
    /// An unmount failure is logged and does not stop the record from being dropped.
    pub async fn remove(&self, name: &str) -> VolumeResult<()> {
        let id = RepoId::parse(name)?;
        let volume_name = id.volume_name();
        info!("remove {} :: {}", name, volume_name);

        if let Err(e) = self.controller.umount_tag(&id).await {
            warn!("failed to unmount :: {}", e);
        }
        if let Some(record) = self.registry.remove(&volume_name).await? {
            if record.reference_count > 0 {
                warn!(
                    "{} dropped with {} active mount(s)",
                    volume_name, record.reference_count
                );
            }
        }

        info!("{} dropped from cache", volume_name);
        Ok(())
    }

    /// Mount path of a registered volume
    pub async fn path(&self, name: &str) -> VolumeResult<PathBuf> {
        Ok(self.get(name).await?.path)
    }

    /// Registered volume by (possibly non-canonical) name
    pub async fn get(&self, name: &str) -> VolumeResult<MountRecord> {
        let volume_name = RepoId::parse(name)?.volume_name();
        self.registry.get(&volume_name).await
    }

    /// All registered volumes
    pub async fn list(&self) -> Vec<MountRecord> {
        self.registry.list().await
    }

    /// Volume scope advertised to the runtime
    pub fn capabilities(&self) -> &'static str {
        SCOPE
    }
}
