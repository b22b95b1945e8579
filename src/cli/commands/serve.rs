//! Serve command - run the Docker volume plugin

use crate::config::Config;
use crate::controller::RepoController;
use crate::driver::VolumeDriver;
use crate::error::VolumeResult;
use crate::mount::SystemMounter;
use crate::plugin::PluginServer;
use crate::registry::VolumeRegistry;
use std::sync::Arc;
use tracing::info;

/// Execute the serve command
pub async fn execute(config: &Config) -> VolumeResult<()> {
    info!(
        "initializing driver :: mount point: {}",
        config.mount.mountpoint.display()
    );

    let controller = RepoController::new(&config.mount, Arc::new(SystemMounter::new()));
    let registry = VolumeRegistry::open(config.state_file()).await;
    let driver = Arc::new(VolumeDriver::new(controller, registry));

    PluginServer::new(config.plugin.socket.clone(), driver)
        .run()
        .await
}
