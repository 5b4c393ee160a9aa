//! Installation license verification
//!
//! `POST /api/verify` registers an (extensionId, installationId) pair on
//! first sight and refreshes its `updatedAt` on every later call. Once the
//! extension passes the allow-list the answer is always
//! `{verified: true, expiryTime: null, installationId}`; licenses never
//! expire and cannot be revoked here.

use bytes::Bytes;
use chrono::Utc;
use http_body_util::Full;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::routes::gate::{ingress_gate, json_response, read_json_body};
use crate::routes::schema::VERIFY_SCHEMA;
use crate::server::AppState;
use crate::services::Registration;
use crate::types::RelayError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest {
    extension_id: String,
    installation_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    verified: bool,
    expiry_time: Option<String>,
    installation_id: String,
}

pub async fn handle_verify<B>(req: Request<B>, state: Arc<AppState>) -> Response<Full<Bytes>>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    if let Some(response) = ingress_gate(req.method()) {
        return response;
    }

    let body = read_json_body(req).await;
    let request: VerifyRequest = match VERIFY_SCHEMA.parse(body) {
        Ok(r) => r,
        Err(e) => return verification_failure(e.status_code(), &e.to_string()),
    };

    if !state.args.is_allowed_extension(&request.extension_id) {
        warn!(extension_id = %request.extension_id, "Verification from unknown extension");
        let err = RelayError::Unauthorized("Unauthorized extension".to_string());
        return verification_failure(err.status_code(), &err.to_string());
    }

    match state
        .licenses
        .register(&request.extension_id, &request.installation_id, Utc::now())
        .await
    {
        Ok(registration) => {
            info!(
                extension_id = %request.extension_id,
                installation_id = %request.installation_id,
                created = registration == Registration::Created,
                "Installation verified"
            );
            json_response(
                StatusCode::OK,
                VerifyResponse {
                    verified: true,
                    expiry_time: None,
                    installation_id: request.installation_id,
                },
            )
        }
        Err(e) => {
            error!("Error in license verification: {}", e);
            verification_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error during verification",
            )
        }
    }
}

fn verification_failure(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        serde_json::json!({
            "verified": false,
            "error": message,
        }),
    )
}
