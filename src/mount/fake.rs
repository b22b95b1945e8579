//! In-memory mounter for tests and dry runs
//!
//! Tracks which paths are "mounted" and how many times each facility was
//! invoked, without touching the host mount table.

use crate::error::{VolumeError, VolumeResult};
use crate::mount::Mounter;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Ledger {
    mounted: HashSet<PathBuf>,
    mounts: usize,
    unmounts: usize,
    binds: Vec<(PathBuf, PathBuf)>,
}

/// Mounter fake that records every call
#[derive(Debug, Default)]
pub struct RecordingMounter {
    ledger: Mutex<Ledger>,
    fail_mounts: AtomicBool,
}

impl RecordingMounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mounter whose `mount` always fails
    pub fn failing() -> Self {
        let mounter = Self::new();
        mounter.set_fail_mounts(true);
        mounter
    }

    /// Toggle failure of subsequent `mount` calls
    pub fn set_fail_mounts(&self, fail: bool) {
        self.fail_mounts.store(fail, Ordering::SeqCst);
    }

    /// Number of times the mount facility was invoked
    pub fn mount_calls(&self) -> usize {
        self.ledger().mounts
    }

    /// Number of times the unmount facility was invoked
    pub fn unmount_calls(&self) -> usize {
        self.ledger().unmounts
    }

    /// Bind mounts performed, as `(source, target)`
    pub fn binds(&self) -> Vec<(PathBuf, PathBuf)> {
        self.ledger().binds.clone()
    }

    /// Whether `path` is mounted right now
    pub fn holds(&self, path: &Path) -> bool {
        self.ledger().mounted.contains(path)
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        // poisoned by a panicking test; the ledger itself is still valid
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Mounter for RecordingMounter {
    async fn is_mounted(&self, path: &Path) -> std::io::Result<bool> {
        Ok(self.holds(path))
    }

    async fn mount(&self, repo: &str, _config: &Path, target: &Path) -> VolumeResult<()> {
        // let concurrent callers interleave the way a slow mount would
        tokio::task::yield_now().await;

        let mut ledger = self.ledger();
        ledger.mounts += 1;
        if self.fail_mounts.load(Ordering::SeqCst) {
            return Err(VolumeError::MountExec {
                repo: repo.to_string(),
                detail: "exit status: 32 :: mount: failed to mount".to_string(),
            });
        }
        ledger.mounted.insert(target.to_path_buf());
        Ok(())
    }

    async fn unmount(&self, repo: &str, target: &Path) -> VolumeResult<()> {
        let mut ledger = self.ledger();
        ledger.unmounts += 1;
        if ledger.mounted.remove(target) {
            Ok(())
        } else {
            Err(VolumeError::UnmountExec {
                repo: repo.to_string(),
                detail: format!("exit status: 32 :: umount: {}: not mounted", target.display()),
            })
        }
    }

    async fn bind(&self, source: &Path, target: &Path) -> VolumeResult<()> {
        let mut ledger = self.ledger();
        ledger.binds.push((source.to_path_buf(), target.to_path_buf()));
        ledger.mounted.insert(target.to_path_buf());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
