//! License document schema
//!
//! One record per (extensionId, installationId) pair. Records are created on
//! first verification and only ever have `updatedAt` refreshed afterwards.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for licenses
pub const LICENSE_COLLECTION: &str = "licenses";

/// License document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub extension_id: String,

    pub installation_id: String,

    /// Always true once the record exists
    pub verified: bool,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    /// Time of the most recent verification
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl LicenseDoc {
    /// Create a freshly verified license
    pub fn new(extension_id: String, installation_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            extension_id,
            installation_id,
            verified: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Filter matching the composite identity
    pub fn identity_filter(extension_id: &str, installation_id: &str) -> Document {
        doc! {
            "extensionId": extension_id,
            "installationId": installation_id,
        }
    }

    /// Upsert body for one verification
    ///
    /// `updatedAt` is set on every call; `verified` and `createdAt` are only
    /// written when the upsert inserts.
    pub fn registration_update(now: DateTime<Utc>) -> Document {
        let now = bson::DateTime::from_chrono(now);
        doc! {
            "$set": { "updatedAt": now },
            "$setOnInsert": { "verified": true, "createdAt": now },
        }
    }

    pub fn matches(&self, extension_id: &str, installation_id: &str) -> bool {
        self.extension_id == extension_id && self.installation_id == installation_id
    }
}

impl IntoIndexes for LicenseDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Composite identity; makes the upsert safe under concurrent first verifications
            (
                doc! { "extensionId": 1, "installationId": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("extension_installation_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
