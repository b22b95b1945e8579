//! Volume plugin protocol types
//!
//! Field names follow the Docker volume plugin protocol, which uses
//! PascalCase keys (and `ID` for the consumer id).

use crate::registry::MountRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Body of every `/VolumeDriver.*` request
///
/// All fields are optional on the wire; `List` and `Capabilities` send an
/// empty object or no body at all.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub opts: Option<HashMap<String, String>>,
}

/// Reply to `/Plugin.Activate`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivateResponse {
    pub implements: Vec<String>,
}

impl ActivateResponse {
    pub fn volume_driver() -> Self {
        Self {
            implements: vec!["VolumeDriver".to_string()],
        }
    }
}

/// A volume as reported to the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Volume {
    pub name: String,
    pub mountpoint: PathBuf,
}

impl From<MountRecord> for Volume {
    fn from(record: MountRecord) -> Self {
        Self {
            name: record.volume_name,
            mountpoint: record.path,
        }
    }
}

/// Driver capabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capabilities {
    pub scope: String,
}

/// Reply to every `/VolumeDriver.*` request
///
/// `Err` is always present and empty on success.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mountpoint: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<Volume>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
    #[serde(default)]
    pub err: String,
}

impl VolumeResponse {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            err: message.into(),
            ..Self::default()
        }
    }

    pub fn mountpoint(path: PathBuf) -> Self {
        Self {
            mountpoint: Some(path),
            ..Self::default()
        }
    }
}
