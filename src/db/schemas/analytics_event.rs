//! Analytics event document schema
//!
//! Append-only usage telemetry sent by the extension.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for analytics events
pub const ANALYTICS_COLLECTION: &str = "analytics";

/// Analytics event stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEventDoc {
    /// Event name (e.g. "solve_clicked"), stored as sent
    pub event: serde_json::Value,

    /// Opaque payload supplied by the extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Extension that emitted the event, stored as sent
    pub extension_id: serde_json::Value,

    /// Client-supplied time, or receipt time
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl AnalyticsEventDoc {
    pub fn new(
        event: serde_json::Value,
        data: Option<serde_json::Value>,
        extension_id: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event,
            data,
            extension_id,
            timestamp,
        }
    }
}

impl IntoIndexes for AnalyticsEventDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "extensionId": 1, "timestamp": -1 },
            Some(
                IndexOptions::builder()
                    .name("extension_timestamp_index".to_string())
                    .build(),
            ),
        )]
    }
}
