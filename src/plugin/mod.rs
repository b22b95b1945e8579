//! Docker volume plugin endpoint
//!
//! Every route is a POST carrying a JSON body. The runtime sends
//! `application/vnd.docker.plugins.v1.x+json`, so bodies are taken as raw
//! bytes and decoded here rather than through the `Json` extractor.

mod server;
pub mod types;

pub use server::PluginServer;
pub use types::{Capabilities, Volume, VolumeRequest, VolumeResponse};

use crate::driver::VolumeDriver;
use crate::error::{VolumeError, VolumeResult};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{debug, warn};
use types::ActivateResponse;

/// Handler state
#[derive(Clone)]
pub struct PluginState {
    pub driver: Arc<VolumeDriver>,
}

/// Build the plugin router around `driver`
pub fn create_router(driver: Arc<VolumeDriver>) -> Router {
    Router::new()
        .route("/Plugin.Activate", post(activate))
        .route("/VolumeDriver.Create", post(create))
        .route("/VolumeDriver.Remove", post(remove))
        .route("/VolumeDriver.Mount", post(mount))
        .route("/VolumeDriver.Unmount", post(unmount))
        .route("/VolumeDriver.Path", post(path))
        .route("/VolumeDriver.Get", post(get))
        .route("/VolumeDriver.List", post(list))
        .route("/VolumeDriver.Capabilities", post(capabilities))
        .with_state(PluginState { driver })
}

impl IntoResponse for VolumeError {
    fn into_response(self) -> Response {
        warn!("{}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(VolumeResponse::error(self.to_string())),
        )
            .into_response()
    }
}

type Reply = Result<Json<VolumeResponse>, VolumeError>;

fn decode(body: &Bytes) -> VolumeResult<VolumeRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(VolumeRequest::default());
    }
    Ok(serde_json::from_slice(body)?)
}

async fn activate() -> Json<ActivateResponse> {
    debug!("activate");
    Json(ActivateResponse::volume_driver())
}

async fn create(State(state): State<PluginState>, body: Bytes) -> Reply {
    let req = decode(&body)?;
    debug!("create request {:?}", req);
    state.driver.create(&req.name).await?;
    Ok(Json(VolumeResponse::ok()))
}

async fn remove(State(state): State<PluginState>, body: Bytes) -> Reply {
    let req = decode(&body)?;
    state.driver.remove(&req.name).await?;
    Ok(Json(VolumeResponse::ok()))
}

async fn mount(State(state): State<PluginState>, body: Bytes) -> Reply {
    let req = decode(&body)?;
    debug!("mount {} for {}", req.name, req.id);
    let path = state.driver.mount(&req.name).await?;
    Ok(Json(VolumeResponse::mountpoint(path)))
}

async fn unmount(State(state): State<PluginState>, body: Bytes) -> Reply {
    let req = decode(&body)?;
    debug!("unmount {} for {}", req.name, req.id);
    state.driver.unmount(&req.name).await?;
    Ok(Json(VolumeResponse::ok()))
}

async fn path(State(state): State<PluginState>, body: Bytes) -> Reply {
    let req = decode(&body)?;
    let path = state.driver.path(&req.name).await?;
    debug!("{} found at {}", req.name, path.display());
    Ok(Json(VolumeResponse::mountpoint(path)))
}

async fn get(State(state): State<PluginState>, body: Bytes) -> Reply {
    let req = decode(&body)?;
    let record = state.driver.get(&req.name).await?;
    Ok(Json(VolumeResponse {
        volume: Some(record.into()),
        ..VolumeResponse::default()
    }))
}

async fn list(State(state): State<PluginState>) -> Reply {
    let volumes = state.driver.list().await;
    Ok(Json(VolumeResponse {
        volumes: Some(volumes.into_iter().map(Volume::from).collect()),
        ..VolumeResponse::default()
    }))
}

async fn capabilities(State(state): State<PluginState>) -> Reply {
    Ok(Json(VolumeResponse {
        capabilities: Some(Capabilities {
            scope: state.driver.capabilities().to_string(),
        }),
        ..VolumeResponse::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MountConfig;
    use crate::controller::RepoController;
    use crate::mount::RecordingMounter;
    use crate::registry::VolumeRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1.2+json";

    async fn app(root: &Path, mounter: Arc<RecordingMounter>) -> Router {
        let base = root.join("default.conf");
        std::fs::write(&base, "CVMFS_HTTP_PROXY=DIRECT\n").unwrap();
        let settings = MountConfig {
            mountpoint: root.join("cvmfs"),
            config_dir: root.join("etc"),
            cache_root: root.join("cache"),
            base_configs: vec![base],
            service_uid: None,
        };
        let driver = VolumeDriver::new(
            RepoController::new(&settings, mounter),
            VolumeRegistry::open(root.join("docker.cache")).await,
        );
        create_router(Arc::new(driver))
    }

    async fn call(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", CONTENT_TYPE)
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn activate_advertises_volume_driver() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), Arc::new(RecordingMounter::new())).await;

        let (status, body) = call(&app, "/Plugin.Activate", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"Implements": ["VolumeDriver"]}));
    }

    #[tokio::test]
    async fn mount_path_unmount_cycle() {
        let dir = TempDir::new().unwrap();
        let mounter = Arc::new(RecordingMounter::new());
        let app = app(dir.path(), mounter.clone()).await;
        let expected = dir.path().join("cvmfs/alice.cern.ch/trunk");

        let (status, body) = call(&app, "/VolumeDriver.Create", r#"{"Name":"alice.cern.ch","Opts":{}}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Err"], "");

        let (_, body) = call(&app, "/VolumeDriver.Mount", r#"{"Name":"alice.cern.ch","ID":"abc"}"#).await;
        assert_eq!(body["Mountpoint"], expected.to_str().unwrap());
        assert_eq!(body["Err"], "");

        let (_, body) = call(&app, "/VolumeDriver.Path", r#"{"Name":"alice.cern.ch@trunk"}"#).await;
        assert_eq!(body["Mountpoint"], expected.to_str().unwrap());

        let (_, body) = call(&app, "/VolumeDriver.Unmount", r#"{"Name":"alice.cern.ch","ID":"abc"}"#).await;
        assert_eq!(body["Err"], "");
        assert_eq!(mounter.mount_calls(), 1);
    }

    #[tokio::test]
    async fn get_and_list() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), Arc::new(RecordingMounter::new())).await;

        call(&app, "/VolumeDriver.Create", r#"{"Name":"cms.cern.ch#abcd"}"#).await;
        call(&app, "/VolumeDriver.Create", r#"{"Name":"atlas.cern.ch@prod"}"#).await;

        let (_, body) = call(&app, "/VolumeDriver.Get", r#"{"Name":"cms.cern.ch#abcd"}"#).await;
        assert_eq!(body["Volume"]["Name"], "cms.cern.ch#abcd");

        let (_, body) = call(&app, "/VolumeDriver.List", "{}").await;
        let names: Vec<_> = body["Volumes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["Name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["atlas.cern.ch@prod", "cms.cern.ch#abcd"]);
        assert_eq!(body["Err"], "");
    }

    #[tokio::test]
    async fn unknown_volume_reports_err() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), Arc::new(RecordingMounter::new())).await;

        let (status, body) = call(&app, "/VolumeDriver.Path", r#"{"Name":"lhcb.cern.ch"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["Err"], "lhcb.cern.ch@trunk volume not found");
    }

    #[tokio::test]
    async fn mount_failure_reports_err() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), Arc::new(RecordingMounter::failing())).await;

        let (_, body) = call(&app, "/VolumeDriver.Mount", r#"{"Name":"alice.cern.ch@prod"}"#).await;
        assert!(body["Err"].as_str().unwrap().contains("alice.cern.ch"));
    }

    #[tokio::test]
    async fn remove_drops_volume() {
        let dir = TempDir::new().unwrap();
        let mounter = Arc::new(RecordingMounter::new());
        let app = app(dir.path(), mounter.clone()).await;

        call(&app, "/VolumeDriver.Mount", r#"{"Name":"atlas.cern.ch"}"#).await;
        let (_, body) = call(&app, "/VolumeDriver.Remove", r#"{"Name":"atlas.cern.ch"}"#).await;
        assert_eq!(body["Err"], "");

        let (_, body) = call(&app, "/VolumeDriver.List", "").await;
        assert_eq!(body["Volumes"], json!([]));
        assert_eq!(mounter.unmount_calls(), 1);
    }

    #[tokio::test]
    async fn capabilities_scope() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), Arc::new(RecordingMounter::new())).await;

        let (_, body) = call(&app, "/VolumeDriver.Capabilities", "").await;
        assert_eq!(body["Capabilities"]["Scope"], "local");
    }

    #[tokio::test]
    async fn malformed_body_reports_err() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), Arc::new(RecordingMounter::new())).await;

        let (status, body) = call(&app, "/VolumeDriver.Create", "{oops").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["Err"].as_str().unwrap().is_empty());
    }
}
