//! Service endpoints
//!
//! - `/`        - Liveness banner the game client pings on start
//! - `/health`  - Liveness with uptime and store backend
//! - `/version` - Build metadata for deployment checks

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::response::{json_response, BoxBody};
use crate::server::AppState;

pub const LIVE_MESSAGE: &str = "Super Quiz Hero API is LIVE!";

#[derive(Serialize)]
pub struct RootResponse {
    pub msg: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Seconds since start
    pub uptime: u64,
    pub timestamp: String,
    /// "development" or "production"
    pub mode: &'static str,
    pub node_id: String,
    /// Player store backend: "mongodb" or "memory"
    pub store: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

pub fn root_message() -> Response<BoxBody> {
    json_response(StatusCode::OK, &RootResponse { msg: LIVE_MESSAGE })
}

pub fn health_check(state: &AppState) -> Response<BoxBody> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        node_id: state.args.node_id.to_string(),
        store: state.players.store().backend(),
    };

    json_response(StatusCode::OK, &response)
}

pub fn version_info() -> Response<BoxBody> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "quizhero",
    };

    json_response(StatusCode::OK, &response)
}
