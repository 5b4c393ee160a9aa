//! Usage event recording
//!
//! `POST /api/analytics` stores one event and always answers
//! `{success: true}` once the required fields are present. Storage trouble
//! is logged and never reaches the extension.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use http_body_util::Full;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::db::schemas::AnalyticsEventDoc;
use crate::routes::gate::{error_response, ingress_gate, json_response, read_json_body};
use crate::routes::schema::RECORD_EVENT_SCHEMA;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordEventRequest {
    event: Value,
    #[serde(default)]
    data: Option<Value>,
    extension_id: Value,
    #[serde(default)]
    timestamp: Option<Value>,
}

pub async fn handle_record_event<B>(req: Request<B>, state: Arc<AppState>) -> Response<Full<Bytes>>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    if let Some(response) = ingress_gate(req.method()) {
        return response;
    }

    let body = read_json_body(req).await;
    let request: RecordEventRequest = match RECORD_EVENT_SCHEMA.parse(body) {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };

    let received_at = Utc::now();
    let timestamp = match request.timestamp.as_ref() {
        Some(value) if is_set(value) => parse_timestamp(value).unwrap_or_else(|| {
            warn!(timestamp = %value, "Unparseable event timestamp, using receipt time");
            received_at
        }),
        _ => received_at,
    };

    let event = AnalyticsEventDoc::new(request.event, request.data, request.extension_id, timestamp);
    debug!(event = %event.event, extension_id = %event.extension_id, "Recording analytics event");

    if let Err(e) = state.events.append(event).await {
        error!("Database error in analytics: {}", e);
    }

    json_response(StatusCode::OK, serde_json::json!({ "success": true }))
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

/// Epoch milliseconds, RFC 3339, or a bare `YYYY-MM-DD` date (UTC midnight)
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{args, post_json, read_json, state_with};
    use crate::services::MemoryStore;
    use serde_json::json;

    fn memory_state(store: Arc<MemoryStore>) -> Arc<AppState> {
        state_with(args(&["--memory-store"]), store)
    }

    #[tokio::test]
    async fn test_records_event() {
        let store = Arc::new(MemoryStore::new());
        let response = handle_record_event(
            post_json(
                "/api/analytics",
                json!({ "event": "solve_clicked", "data": { "site": "example.com" }, "extensionId": "ext1" }),
            ),
            memory_state(Arc::clone(&store)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "success": true }));

        let events = store.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "solve_clicked");
        assert_eq!(events[0].extension_id, "ext1");
        assert_eq!(events[0].data, Some(json!({ "site": "example.com" })));
    }

    #[tokio::test]
    async fn test_non_string_fields_are_recorded() {
        let store = Arc::new(MemoryStore::new());
        let response = handle_record_event(
            post_json("/api/analytics", json!({ "event": 42, "extensionId": "ext1" })),
            memory_state(Arc::clone(&store)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "success": true }));

        let events = store.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, json!(42));
        assert_eq!(events[0].extension_id, "ext1");
    }

    #[tokio::test]
    async fn test_storage_failure_still_succeeds() {
        let store = Arc::new(MemoryStore::new().with_failure(true));
        let response = handle_record_event(
            post_json("/api/analytics", json!({ "event": "popup_opened", "extensionId": "ext1" })),
            memory_state(Arc::clone(&store)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "success": true }));
        assert!(store.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_without_write() {
        let store = Arc::new(MemoryStore::new());
        for body in [
            json!({ "extensionId": "ext1" }),
            json!({ "event": "popup_opened" }),
            json!({ "event": "", "extensionId": "ext1" }),
        ] {
            let response = handle_record_event(
                post_json("/api/analytics", body),
                memory_state(Arc::clone(&store)),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                read_json(response).await,
                json!({ "error": "Missing required parameters" })
            );
        }
        assert!(store.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_client_timestamp_honored() {
        let store = Arc::new(MemoryStore::new());
        handle_record_event(
            post_json(
                "/api/analytics",
                json!({ "event": "e", "extensionId": "ext1", "timestamp": 1_700_000_000_000i64 }),
            ),
            memory_state(Arc::clone(&store)),
        )
        .await;
        handle_record_event(
            post_json(
                "/api/analytics",
                json!({ "event": "e", "extensionId": "ext1", "timestamp": "2024-05-01T10:00:00Z" }),
            ),
            memory_state(Arc::clone(&store)),
        )
        .await;

        let events = store.events().await;
        assert_eq!(events[0].timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(events[1].timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[tokio::test]
    async fn test_garbage_timestamp_falls_back_to_receipt_time() {
        let store = Arc::new(MemoryStore::new());
        let before = Utc::now();
        handle_record_event(
            post_json(
                "/api/analytics",
                json!({ "event": "e", "extensionId": "ext1", "timestamp": "yesterday-ish" }),
            ),
            memory_state(Arc::clone(&store)),
        )
        .await;

        let events = store.events().await;
        assert!(events[0].timestamp >= before);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(
            parse_timestamp(&json!("2024-05-01")).unwrap().to_rfc3339(),
            "2024-05-01T00:00:00+00:00"
        );
        assert!(parse_timestamp(&json!(true)).is_none());
        assert!(parse_timestamp(&json!("not a date")).is_none());
        assert!(!is_set(&json!(0)));
        assert!(!is_set(&json!("")));
    }
}
