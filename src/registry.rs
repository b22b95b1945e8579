//! Reference-counted volume registry
//!
//! Maps canonical volume names to their mount path and number of active
//! consumers. Every mutation rewrites the full snapshot while still holding
//! the registry lock, so the file on disk never reflects a half-applied
//! change.
//!
//! Snapshot format (JSON):
//!
//! ```json
//! {"alice.cern.ch@trunk": {"path": "/cvmfs/alice.cern.ch/trunk", "referenceCount": 2}}
//! ```

use crate::error::{VolumeError, VolumeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Persisted state of one volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    path: PathBuf,
    reference_count: i64,
}

/// A registered volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MountRecord {
    pub volume_name: String,
    pub path: PathBuf,
    /// Active consumers; not clamped, so unbalanced detaches drive it negative
    pub reference_count: i64,
}

impl MountRecord {
    fn from_entry(name: &str, entry: &Entry) -> Self {
        Self {
            volume_name: name.to_string(),
            path: entry.path.clone(),
            reference_count: entry.reference_count,
        }
    }
}

/// Durable map of volume name to mount record
pub struct VolumeRegistry {
    state_file: PathBuf,
    volumes: Mutex<BTreeMap<String, Entry>>,
}

impl VolumeRegistry {
    /// Open the registry backed by `state_file`
    ///
    /// A missing file is created empty. An unreadable or corrupt file is
    /// logged and the registry starts empty; the next mutation overwrites it.
    pub async fn open(state_file: impl Into<PathBuf>) -> Self {
        let state_file = state_file.into();
        let volumes = Self::load(&state_file).await;
        info!(
            "volume registry {} holds {} volume(s)",
            state_file.display(),
            volumes.len()
        );
        Self {
            state_file,
            volumes: Mutex::new(volumes),
        }
    }

    async fn load(path: &Path) -> BTreeMap<String, Entry> {
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Err(e) = Self::touch(path).await {
                    warn!("failed to create registry {} :: {}", path.display(), e);
                }
                return BTreeMap::new();
            }
            Err(e) => {
                warn!("failed to read registry {}, ignoring :: {}", path.display(), e);
                return BTreeMap::new();
            }
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return BTreeMap::new();
        }

        serde_json::from_slice(&content).unwrap_or_else(|e| {
            warn!("failed to unmarshal registry data, ignoring :: {}", e);
            BTreeMap::new()
        })
    }

    async fn touch(path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, b"").await
    }

    /// Snapshot file backing this registry
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Register `volume_name` at `path` with no consumers
    ///
    /// An existing record is left untouched. The snapshot is flushed either way.
    pub async fn create(&self, volume_name: &str, path: PathBuf) -> VolumeResult<()> {
        let mut volumes = self.volumes.lock().await;
        volumes
            .entry(volume_name.to_string())
            .or_insert_with(|| Entry {
                path,
                reference_count: 0,
            });
        self.persist(&volumes).await
    }

    /// Look up a volume
    pub async fn get(&self, volume_name: &str) -> VolumeResult<MountRecord> {
        let volumes = self.volumes.lock().await;
        volumes
            .get(volume_name)
            .map(|entry| MountRecord::from_entry(volume_name, entry))
            .ok_or_else(|| VolumeError::VolumeNotFound(volume_name.to_string()))
    }

    /// Whether `volume_name` is registered
    pub async fn contains(&self, volume_name: &str) -> bool {
        self.volumes.lock().await.contains_key(volume_name)
    }

    /// All registered volumes, ordered by name
    pub async fn list(&self) -> Vec<MountRecord> {
        let volumes = self.volumes.lock().await;
        volumes
            .iter()
            .map(|(name, entry)| MountRecord::from_entry(name, entry))
            .collect()
    }

    /// Add `delta` to the reference count of `volume_name`
    ///
    /// Unknown names leave the map unchanged but still flush the snapshot.
    /// Returns the updated record, if any.
    pub async fn adjust(
        &self,
        volume_name: &str,
        delta: i64,
    ) -> VolumeResult<Option<MountRecord>> {
        let mut volumes = self.volumes.lock().await;
        let updated = match volumes.get_mut(volume_name) {
            Some(entry) => {
                Self::apply(volume_name, entry, delta);
                Some(MountRecord::from_entry(volume_name, entry))
            }
            None => {
                debug!("{} not registered, flushing only", volume_name);
                None
            }
        };
        self.persist(&volumes).await?;
        Ok(updated)
    }

    /// Register `volume_name` at `path` if needed and add one consumer
    ///
    /// Both steps happen under one lock, so a concurrent `remove` cannot
    /// slip in between them.
    pub async fn acquire(&self, volume_name: &str, path: PathBuf) -> VolumeResult<MountRecord> {
        let mut volumes = self.volumes.lock().await;
        let entry = volumes
            .entry(volume_name.to_string())
            .or_insert_with(|| Entry {
                path,
                reference_count: 0,
            });
        Self::apply(volume_name, entry, 1);
        let record = MountRecord::from_entry(volume_name, entry);
        self.persist(&volumes).await?;
        Ok(record)
    }

    fn apply(volume_name: &str, entry: &mut Entry, delta: i64) {
        let before = entry.reference_count;
        entry.reference_count += delta;
        info!(
            "{} had {} mounts, now {}",
            volume_name, before, entry.reference_count
        );
    }

    /// Drop `volume_name` regardless of its reference count
    pub async fn remove(&self, volume_name: &str) -> VolumeResult<Option<MountRecord>> {
        let mut volumes = self.volumes.lock().await;
        let removed = volumes
            .remove(volume_name)
            .map(|entry| MountRecord::from_entry(volume_name, &entry));
        self.persist(&volumes).await?;
        Ok(removed)
    }

    /// Rewrite the snapshot; callers hold the lock
    async fn persist(&self, volumes: &BTreeMap<String, Entry>) -> VolumeResult<()> {
        let data = serde_json::to_vec(volumes)?;
        let io_err = |source| VolumeError::RegistryIo {
            path: self.state_file.clone(),
            source,
        };

        let mut tmp = self.state_file.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, &data).await.map_err(io_err)?;
        fs::rename(&tmp, &self.state_file).await.map_err(io_err)?;
        Ok(())
    }
}
