//! Ingress gate shared by every API handler
//!
//! - `OPTIONS` is answered immediately with 200, no body, CORS headers
//! - anything other than `POST` is rejected with 405
//! - every response the handlers produce carries the CORS headers

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::http::response::Builder;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::RelayError;

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "POST, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, X-Extension-ID";

/// Header the extension uses to identify itself
pub const EXTENSION_ID_HEADER: &str = "x-extension-id";

/// Apply the method contract; `None` means the request may proceed
pub fn ingress_gate(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::POST => None,
        Method::OPTIONS => Some(preflight_response()),
        _ => Some(error_response(RelayError::MethodNotAllowed)),
    }
}

fn with_cors(builder: Builder) -> Builder {
    builder
        .header("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN)
        .header("Access-Control-Allow-Methods", CORS_ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS)
}

/// CORS preflight response
pub fn preflight_response() -> Response<Full<Bytes>> {
    with_cors(Response::builder().status(StatusCode::OK))
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// JSON response carrying the CORS headers
pub fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(&body) {
        Ok(json) => with_cors(Response::builder().status(status))
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|_| internal_error_fallback("Failed to build response")),
        Err(_) => internal_error_fallback("Failed to serialize response"),
    }
}

fn internal_error_fallback(message: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// `{error: <message>}` with the error's status
pub fn error_response(err: RelayError) -> Response<Full<Bytes>> {
    let (status, message) = err.into_status_code_and_body();
    json_response(status, serde_json::json!({ "error": message }))
}

/// Not found response
pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        serde_json::json!({
            "error": "Not Found",
            "path": path,
        }),
    )
}

/// Read the body as a JSON object
///
/// Unreadable bodies, invalid JSON and non-object JSON all come back as an
/// empty object so the endpoint's own validation produces the error.
pub async fn read_json_body<B>(req: Request<B>) -> Map<String, Value>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return Map::new();
        }
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => {
            debug!("Request body is not valid JSON: {}", e);
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{json_request, read_json};

    #[test]
    fn test_post_passes_gate() {
        assert!(ingress_gate(&Method::POST).is_none());
    }

    #[tokio::test]
    async fn test_preflight_has_no_body() {
        let response = ingress_gate(&Method::OPTIONS).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("Access-Control-Allow-Origin").unwrap(), "*");
        assert_eq!(headers.get("Access-Control-Allow-Methods").unwrap(), "POST, OPTIONS");
        assert_eq!(
            headers.get("Access-Control-Allow-Headers").unwrap(),
            "Content-Type, X-Extension-ID"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_other_methods_rejected() {
        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let response = ingress_gate(&method).unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(
                response.headers().get("Access-Control-Allow-Origin").unwrap(),
                "*"
            );
            let body = read_json(response).await;
            assert_eq!(body["error"], "Method not allowed");
        }
    }

    #[tokio::test]
    async fn test_malformed_body_reads_as_empty_object() {
        let req = json_request(Method::POST, "/api/verify", "{not json");
        assert!(read_json_body(req).await.is_empty());

        let req = json_request(Method::POST, "/api/verify", "[1, 2, 3]");
        assert!(read_json_body(req).await.is_empty());

        let req = json_request(Method::POST, "/api/verify", r#"{"a": 1}"#);
        assert_eq!(read_json_body(req).await.get("a"), Some(&Value::from(1)));
    }
}
