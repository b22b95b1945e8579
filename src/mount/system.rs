//! Host mount facility
//!
//! Mount status comes from the filesystem magic of the target path rather
//! than any bookkeeping, so a mount survives (and is recognised after) a
//! restart of this process.

use crate::error::{VolumeError, VolumeResult};
use crate::mount::Mounter;
use async_trait::async_trait;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info};

/// `statfs` magic reported for FUSE filesystems, which cvmfs mounts are
pub const FUSE_SUPER_MAGIC: u64 = 0x6573_5546;

/// Mounter that runs the host `mount`/`umount` binaries
#[derive(Debug)]
pub struct SystemMounter;

impl SystemMounter {
    pub fn new() -> Self {
        Self
    }

    /// Run a command and capture its output
    async fn exec(mut command: Command) -> VolumeResult<Output> {
        let description = format!("{:?}", command.as_std());
        debug!("Executing: {}", description);

        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| VolumeError::command_failed(description, e))
    }
}

impl Default for SystemMounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Exit status followed by stdout and stderr, for error reports
fn diagnostic(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{} :: {}{}", output.status, stdout, stderr)
        .trim_end()
        .to_string()
}

/// Filesystem type magic of the filesystem containing `path`
#[allow(clippy::unnecessary_cast, clippy::cast_sign_loss)]
fn filesystem_type(path: &Path) -> std::io::Result<u64> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let mut stat: libc::statfs = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::statfs(c_path.as_ptr(), &mut stat) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }

    Ok(stat.f_type as u64)
}

#[async_trait]
impl Mounter for SystemMounter {
    async fn is_mounted(&self, path: &Path) -> std::io::Result<bool> {
        let owned: PathBuf = path.to_path_buf();
        let magic = tokio::task::spawn_blocking(move || filesystem_type(&owned))
            .await
            .map_err(std::io::Error::other)??;
        Ok(magic == FUSE_SUPER_MAGIC)
    }

    async fn mount(&self, repo: &str, config: &Path, target: &Path) -> VolumeResult<()> {
        info!("mounting {} in {}", repo, target.display());

        let mut command = Command::new("mount");
        command
            .args(["-t", "cvmfs", "-o"])
            .arg(format!("config={}", config.display()))
            .arg(repo)
            .arg(target);
        let output = Self::exec(command).await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(VolumeError::MountExec {
                repo: repo.to_string(),
                detail: diagnostic(&output),
            })
        }
    }

    async fn unmount(&self, repo: &str, target: &Path) -> VolumeResult<()> {
        info!("unmounting {}", target.display());

        let mut command = Command::new("umount");
        command.arg(target);
        let output = Self::exec(command).await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(VolumeError::UnmountExec {
                repo: repo.to_string(),
                detail: diagnostic(&output),
            })
        }
    }

    async fn bind(&self, source: &Path, target: &Path) -> VolumeResult<()> {
        info!("bind mounting {} onto {}", source.display(), target.display());

        let mut command = Command::new("mount");
        command.arg("--bind").arg(source).arg(target);
        let output = Self::exec(command).await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(VolumeError::BindMount {
                target: target.to_path_buf(),
                detail: diagnostic(&output),
            })
        }
    }

    fn name(&self) -> &'static str {
        "mount(8)"
    }
}
