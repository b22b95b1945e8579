//! Flexvolume commands - init, attach, detach, mount, unmount
//!
//! Results go to stdout as a single JSON status object; a failure is printed
//! the same way before the error is returned so the process exits non-zero.

use crate::config::Config;
use crate::controller::RepoController;
use crate::error::VolumeResult;
use crate::flex::{FlexDriver, FlexStatus};
use crate::mount::{Mounter, SystemMounter};
use std::path::Path;
use std::sync::Arc;

fn driver(config: &Config) -> FlexDriver {
    let mounter: Arc<dyn Mounter> = Arc::new(SystemMounter::new());
    FlexDriver::new(
        RepoController::new(&config.mount, Arc::clone(&mounter)),
        mounter,
    )
}

fn report(result: VolumeResult<FlexStatus>) -> VolumeResult<()> {
    match result {
        Ok(status) => {
            println!("{}", serde_json::to_string(&status)?);
            Ok(())
        }
        Err(e) => {
            if let Ok(json) = serde_json::to_string(&FlexStatus::failure(&e)) {
                println!("{}", json);
            }
            Err(e)
        }
    }
}

pub fn init(config: &Config) -> VolumeResult<()> {
    report(Ok(driver(config).init()))
}

pub async fn attach(config: &Config, options: Option<&str>) -> VolumeResult<()> {
    report(driver(config).attach(options).await)
}

pub async fn detach(config: &Config, volume: Option<&str>) -> VolumeResult<()> {
    report(driver(config).detach(volume).await)
}

pub async fn mount(
    config: &Config,
    mount_dir: Option<&Path>,
    device: Option<&Path>,
) -> VolumeResult<()> {
    report(driver(config).mount(mount_dir, device).await)
}

pub async fn unmount(config: &Config, mount_dir: Option<&Path>) -> VolumeResult<()> {
    report(driver(config).unmount(mount_dir).await)
}
