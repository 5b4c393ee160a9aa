//! Vision proxy
//!
//! `POST /api/proxy` with `{endpoint, data}`. The extension never sees the
//! upstream API key; this handler attaches it and relays the answer.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::routes::gate::{
    error_response, ingress_gate, json_response, read_json_body, EXTENSION_ID_HEADER,
};
use crate::routes::schema::PROXY_SCHEMA;
use crate::server::AppState;
use crate::services::VisionRequest;
use crate::types::RelayError;

#[derive(Debug, Deserialize)]
struct ProxyRequest {
    endpoint: Value,
    data: Value,
}

pub async fn handle_proxy<B>(req: Request<B>, state: Arc<AppState>) -> Response<Full<Bytes>>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    if let Some(response) = ingress_gate(req.method()) {
        return response;
    }

    let client_id = req
        .headers()
        .get(EXTENSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = read_json_body(req).await;
    let request: ProxyRequest = match PROXY_SCHEMA.parse(body) {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };

    if state.args.proxy_require_extension_id
        && !client_id
            .as_deref()
            .is_some_and(|id| state.args.is_allowed_extension(id))
    {
        warn!(client_id = ?client_id, "Rejected proxy request from unknown client");
        return error_response(RelayError::Unauthorized("Unauthorized client".to_string()));
    }

    if !state.vision.is_configured() {
        error!("Proxy request received but no upstream API key is configured");
        return error_response(RelayError::ServerMisconfigured);
    }

    debug!(endpoint = %request.endpoint, "Proxy request");

    match request.endpoint.as_str().unwrap_or_default() {
        "ping" => json_response(
            StatusCode::OK,
            serde_json::json!({
                "success": true,
                "message": "API is working!",
            }),
        ),
        "vision" => match solve(&state, request.data).await {
            Ok(solution) => json_response(
                StatusCode::OK,
                serde_json::json!({
                    "success": true,
                    "solution": solution,
                }),
            ),
            Err(e) => {
                error!("Error in proxy: {}", e);
                error_response(e)
            }
        },
        _ => error_response(RelayError::UnknownEndpoint),
    }
}

async fn solve(state: &AppState, data: Value) -> Result<Option<String>, RelayError> {
    let request: VisionRequest =
        serde_json::from_value(data).map_err(|_| RelayError::InvalidRequest)?;
    let image = request
        .image
        .as_deref()
        .filter(|image| !image.is_empty())
        .ok_or(RelayError::InvalidRequest)?;

    state.vision.solve(&request, image).await
}
