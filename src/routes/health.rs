//! Health check endpoint
//!
//! `/health` and `/healthz` are liveness probes: 200 whenever the process is
//! serving. Storage and upstream status are informational and are read from
//! local state only, so a probe never opens a database connection or calls
//! the vision API.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::gate::json_response;
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    /// Crate version
    pub version: &'static str,
    /// Short git commit the binary was built from
    pub git_commit: &'static str,
    /// "development" or "production"
    pub mode: &'static str,
    pub node_id: String,
    /// "mongodb" or "memory"
    pub storage: &'static str,
    /// Whether the lazy MongoDB handle has been established
    pub storage_connected: bool,
    /// Whether an upstream API key is configured
    pub vision_configured: bool,
    /// Seconds since the relay started
    pub uptime: u64,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        git_commit: env!("GIT_COMMIT_SHORT"),
        mode: if state.args.dev_mode() {
            "development"
        } else {
            "production"
        },
        node_id: state.args.node_id.to_string(),
        storage: state.storage_kind(),
        storage_connected: state.storage_connected(),
        vision_configured: state.vision.is_configured(),
        uptime: state.started_at.elapsed().as_secs(),
    }
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, build_health_response(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{args, read_json, state_with};
    use crate::services::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_reports_memory_store() {
        let state = state_with(
            args(&[
                "--memory-store",
                "--node-env",
                "development",
                "--openrouter-api-key",
                "sk-test",
            ]),
            Arc::new(MemoryStore::new()),
        );

        let response = health_check(&state);
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["mode"], "development");
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["storageConnected"], true);
        assert_eq!(body["visionConfigured"], true);
        assert_eq!(body["nodeId"], state.args.node_id.to_string());
        assert!(body["gitCommit"].is_string());
        assert!(body["uptime"].is_u64());
    }

    #[test]
    fn test_mongo_state_not_connected_until_used() {
        let state = AppState::new(args(&["--node-env", "production", "--openrouter-api-key", ""]));
        let health = build_health_response(&state);
        assert_eq!(health.storage, "mongodb");
        assert!(!health.storage_connected);
        assert!(!health.vision_configured);
        assert_eq!(health.mode, "production");
    }
}
