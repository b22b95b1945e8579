//! cvmfs-volume - CernVM-FS volumes for container runtimes
//!
//! Mounts cvmfs repositories at `<mountpoint>/<repo>/<tag>` on demand and
//! hands them out as reference-counted volumes, either through the Docker
//! volume plugin protocol or the Kubernetes flexvolume calling convention.

pub mod cli;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod flex;
pub mod mount;
pub mod plugin;
pub mod registry;
pub mod volume;

pub use error::{VolumeError, VolumeResult};
