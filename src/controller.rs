//! Repository mount controller
//!
//! Turns a [`RepoId`] into a mounted directory at `<mountpoint>/<repo>/<tag>`.
//! Mounting is idempotent: the target's filesystem type is checked before the
//! mount facility is invoked, so a repository already mounted (by this or an
//! earlier process) is simply returned.
//!
//! All mount and unmount decisions on the host go through a single lock.

use crate::config::MountConfig;
use crate::error::{VolumeError, VolumeResult};
use crate::mount::artifact::create_open_dir;
use crate::mount::{ConfigGenerator, Mounter};
use crate::volume::RepoId;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Mounts and unmounts repositories on the host
pub struct RepoController {
    mountpoint: PathBuf,
    generator: ConfigGenerator,
    mounter: Arc<dyn Mounter>,
    lock: Mutex<()>,
}

impl RepoController {
    pub fn new(settings: &MountConfig, mounter: Arc<dyn Mounter>) -> Self {
        Self {
            mountpoint: settings.mountpoint.clone(),
            generator: ConfigGenerator::new(settings),
            mounter,
            lock: Mutex::new(()),
        }
    }

    /// Mount path for `(repository, tag)`
    pub fn volume_path(&self, id: &RepoId) -> PathBuf {
        self.mountpoint.join(&id.repository).join(&id.tag)
    }

    /// The generator backing this controller
    pub fn generator(&self) -> &ConfigGenerator {
        &self.generator
    }

    /// Mount `repository` at the default tag
    pub async fn mount(&self, repository: &str) -> VolumeResult<PathBuf> {
        self.mount_tag(&RepoId::trunk(repository)).await
    }

    /// Mount `id`, returning its mount path
    pub async fn mount_tag(&self, id: &RepoId) -> VolumeResult<PathBuf> {
        id.validate()?;
        let _guard = self.lock.lock().await;

        let volume_path = self.volume_path(id);
        let config = self.generator.generate(id).await?;

        match tokio::fs::symlink_metadata(&volume_path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                create_open_dir(&volume_path)
                    .await
                    .map_err(|source| VolumeError::MountDir {
                        repo: id.repository.clone(),
                        path: volume_path.clone(),
                        source,
                    })?;
            }
            Err(source) => {
                return Err(VolumeError::MountCheck {
                    repo: id.repository.clone(),
                    path: volume_path,
                    source,
                });
            }
        }

        let mounted = self
            .mounter
            .is_mounted(&volume_path)
            .await
            .map_err(|source| VolumeError::MountCheck {
                repo: id.repository.clone(),
                path: volume_path.clone(),
                source,
            })?;

        if mounted {
            debug!("{} already mounted at {}", id, volume_path.display());
            return Ok(volume_path);
        }

        if let Err(e) = self
            .mounter
            .mount(&id.repository, &config, &volume_path)
            .await
        {
            if let Err(cleanup) = self.generator.cleanup(id).await {
                warn!(
                    "failed to clean cache {} :: {}",
                    self.generator.cache_base(id).display(),
                    cleanup
                );
            }
            return Err(e);
        }

        info!("mounted {} at {} via {}", id, volume_path.display(), self.mounter.name());
        Ok(volume_path)
    }

    /// Unmount `repository` at the default tag
    pub async fn umount(&self, repository: &str) -> VolumeResult<PathBuf> {
        self.umount_tag(&RepoId::trunk(repository)).await
    }

    /// Unmount `id`, returning the path that was unmounted
    ///
    /// Reference counts are not consulted: other consumers of the same mount
    /// lose it too. The unmount is attempted even if the path is not a cvmfs
    /// mount, in which case the facility's failure is returned.
    pub async fn umount_tag(&self, id: &RepoId) -> VolumeResult<PathBuf> {
        id.validate()?;
        let _guard = self.lock.lock().await;

        let volume_path = self.volume_path(id);
        let mounted = self
            .mounter
            .is_mounted(&volume_path)
            .await
            .map_err(|source| VolumeError::MountCheck {
                repo: id.repository.clone(),
                path: volume_path.clone(),
                source,
            })?;
        if !mounted {
            debug!("{} is not a cvmfs mount", volume_path.display());
        }

        self.mounter.unmount(&id.repository, &volume_path).await?;
        // TODO: reclaim the cache base once no mount of this tag remains
        Ok(volume_path)
    }
}
