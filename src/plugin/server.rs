//! Unix socket server for the volume plugin

use super::create_router;
use crate::driver::VolumeDriver;
use crate::error::{VolumeError, VolumeResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing::{info, warn};

/// Serves the plugin protocol on a Unix socket until interrupted
pub struct PluginServer {
    socket: PathBuf,
    driver: Arc<VolumeDriver>,
}

impl PluginServer {
    pub fn new(socket: PathBuf, driver: Arc<VolumeDriver>) -> Self {
        Self { socket, driver }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket
    }

    /// Bind the socket and serve until SIGINT or SIGTERM
    pub async fn run(&self) -> VolumeResult<()> {
        let listener = self.bind().await?;
        info!("listening on {}", self.socket.display());

        let served = axum::serve(listener, create_router(Arc::clone(&self.driver)))
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Err(e) = tokio::fs::remove_file(&self.socket).await {
            if e.kind() != ErrorKind::NotFound {
                warn!("failed to remove socket {} :: {}", self.socket.display(), e);
            }
        }

        served.map_err(|e| VolumeError::Server(e.to_string()))?;
        info!("plugin server stopped");
        Ok(())
    }

    async fn bind(&self) -> VolumeResult<UnixListener> {
        // left behind by an earlier run that did not shut down cleanly
        match tokio::fs::remove_file(&self.socket).await {
            Ok(()) => info!("removed stale socket {}", self.socket.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(VolumeError::io(
                    format!("removing stale socket {}", self.socket.display()),
                    e,
                ))
            }
        }

        if let Some(parent) = self.socket.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                VolumeError::io(format!("creating socket directory {}", parent.display()), e)
            })?;
        }

        UnixListener::bind(&self.socket)
            .map_err(|e| VolumeError::Server(format!("bind {} :: {}", self.socket.display(), e)))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c :: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM :: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("interrupted, shutting down"),
        _ = terminate => info!("terminated, shutting down"),
    }
}
