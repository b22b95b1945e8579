//! Kubernetes flexvolume driver calls
//!
//! Each call prints one JSON status object on stdout, e.g.
//! `{"status":"Success","device":"/cvmfs/alice.cern.ch/trunk"}` or
//! `{"status":"Failure","message":"no repository given"}`.

use crate::controller::RepoController;
use crate::error::{VolumeError, VolumeResult};
use crate::mount::artifact::create_open_dir;
use crate::mount::Mounter;
use crate::volume::RepoId;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a flexvolume call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Failure,
}

/// Status object printed for the kubelet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlexStatus {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<PathBuf>,
}

impl FlexStatus {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            message: None,
            device: None,
        }
    }

    pub fn device(path: PathBuf) -> Self {
        Self {
            device: Some(path),
            ..Self::success()
        }
    }

    pub fn failure(err: &VolumeError) -> Self {
        Self {
            status: Status::Failure,
            message: Some(err.to_string()),
            device: None,
        }
    }
}

/// Options passed by the kubelet to `attach`
#[derive(Debug, Default, Deserialize)]
pub struct KubeOptions {
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub repository: String,
}

/// Attach, detach, mount and unmount for the kubelet
pub struct FlexDriver {
    controller: RepoController,
    mounter: Arc<dyn Mounter>,
}

impl FlexDriver {
    pub fn new(controller: RepoController, mounter: Arc<dyn Mounter>) -> Self {
        Self {
            controller,
            mounter,
        }
    }

    pub fn init(&self) -> FlexStatus {
        info!("init");
        FlexStatus::success()
    }

    /// Mount the repository named in the JSON `options`
    pub async fn attach(&self, options: Option<&str>) -> VolumeResult<FlexStatus> {
        let options: KubeOptions = serde_json::from_str(options.ok_or(VolumeError::RepoNotFound)?)?;
        if let Some(mountpoint) = &options.mountpoint {
            debug!("kubelet mountpoint {} ignored", mountpoint);
        }

        let id = RepoId::parse(&options.repository)?;
        let path = self.controller.mount_tag(&id).await?;
        Ok(FlexStatus::device(path))
    }

    /// Unmount the repository behind `volume`
    pub async fn detach(&self, volume: Option<&str>) -> VolumeResult<FlexStatus> {
        let id = RepoId::parse(volume.ok_or(VolumeError::RepoNotFound)?)?;
        let path = self.controller.umount_tag(&id).await?;
        Ok(FlexStatus::device(path))
    }

    /// Bind-mount `device` onto `mount_dir`, creating the directory if needed
    pub async fn mount(
        &self,
        mount_dir: Option<&Path>,
        device: Option<&Path>,
    ) -> VolumeResult<FlexStatus> {
        let (mount_dir, device) = match (mount_dir, device) {
            (Some(mount_dir), Some(device)) => (mount_dir, device),
            _ => return Err(VolumeError::RepoNotFound),
        };

        match tokio::fs::symlink_metadata(mount_dir).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                create_open_dir(mount_dir).await.map_err(|e| {
                    VolumeError::io(format!("creating directory {}", mount_dir.display()), e)
                })?;
            }
            Err(e) => {
                return Err(VolumeError::io(
                    format!("checking directory {}", mount_dir.display()),
                    e,
                ))
            }
        }

        self.mounter.bind(device, mount_dir).await?;
        info!("bound {} onto {}", device.display(), mount_dir.display());
        Ok(FlexStatus::success())
    }

    /// Unmount the bind mount at `mount_dir`
    pub async fn unmount(&self, mount_dir: Option<&Path>) -> VolumeResult<FlexStatus> {
        let mount_dir = mount_dir.ok_or(VolumeError::RepoNotFound)?;
        self.mounter
            .unmount(&mount_dir.display().to_string(), mount_dir)
            .await?;
        Ok(FlexStatus::success())
    }
}
