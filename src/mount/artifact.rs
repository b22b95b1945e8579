//! Per-mount cvmfs client configuration
//!
//! Every mount gets its own config file at `<config_dir>/<repo>-<tag>`: the
//! base client configs concatenated in order, followed by a block that points
//! the client at a private cache and pins it to the requested tag.

use crate::config::MountConfig;
use crate::error::{VolumeError, VolumeResult};
use crate::volume::{RepoId, TagKind};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirBuilder};
use tracing::debug;

/// Builds config artifacts and owns the per-tag cache directories
#[derive(Debug, Clone)]
pub struct ConfigGenerator {
    config_dir: PathBuf,
    cache_root: PathBuf,
    base_configs: Vec<PathBuf>,
    service_uid: Option<u32>,
}

impl ConfigGenerator {
    pub fn new(settings: &MountConfig) -> Self {
        Self {
            config_dir: settings.config_dir.clone(),
            cache_root: settings.cache_root.clone(),
            base_configs: settings.base_configs.clone(),
            service_uid: settings.service_uid,
        }
    }

    /// Location of the generated config for `id`
    pub fn config_path(&self, id: &RepoId) -> PathBuf {
        self.config_dir.join(format!("{}-{}", id.repository, id.tag))
    }

    /// Cache directory scoped to `(repository, tag)`
    pub fn cache_base(&self, id: &RepoId) -> PathBuf {
        self.cache_root.join(&id.repository).join(&id.tag)
    }

    /// Write a fresh config artifact for `id` and return its path
    ///
    /// Always rewrites the file, even if one exists from an earlier mount.
    pub async fn generate(&self, id: &RepoId) -> VolumeResult<PathBuf> {
        let fail = |reason: String| VolumeError::ConfigGeneration {
            repo: id.repository.clone(),
            reason,
        };

        let mut content = Vec::new();
        for base in &self.base_configs {
            let bytes = fs::read(base)
                .await
                .map_err(|e| fail(format!("reading {}: {e}", base.display())))?;
            content.extend_from_slice(&bytes);
        }
        content.push(b'\n');

        let cache_base = self.cache_base(id);
        let shared = cache_base.join("shared");
        create_open_dir(&shared)
            .await
            .map_err(|e| fail(format!("creating {}: {e}", shared.display())))?;
        if let Some(uid) = self.service_uid {
            std::os::unix::fs::chown(&shared, Some(uid), Some(0))
                .map_err(|e| fail(format!("chown {}: {e}", shared.display())))?;
        }

        content.extend_from_slice(override_block(id, &cache_base).as_bytes());

        fs::create_dir_all(&self.config_dir)
            .await
            .map_err(|e| fail(format!("creating {}: {e}", self.config_dir.display())))?;
        let path = self.config_path(id);
        fs::write(&path, content)
            .await
            .map_err(|e| fail(format!("writing {}: {e}", path.display())))?;

        debug!("generated config {} for {}", path.display(), id);
        Ok(path)
    }

    /// Remove the cache directory for `id`; a missing directory is not an error
    pub async fn cleanup(&self, id: &RepoId) -> std::io::Result<()> {
        match fs::remove_dir_all(self.cache_base(id)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Create `path` and its parents with mode 0777 (before umask)
pub(crate) async fn create_open_dir(path: &Path) -> std::io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true).mode(0o777);
    builder.create(path).await
}

fn override_block(id: &RepoId, cache_base: &Path) -> String {
    let mut block = format!("CVMFS_CACHE_BASE={}\n", cache_base.display());
    match id.kind {
        TagKind::PinnedHash => {
            block.push_str(&format!("CVMFS_ROOT_HASH={}\n", id.tag));
            block.push_str("CVMFS_AUTO_UPDATE=no\n");
        }
        TagKind::MutableTag => {
            block.push_str(&format!("CVMFS_REPOSITORY_TAG={}\n", id.tag));
        }
    }
    block
}
