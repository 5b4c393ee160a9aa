//! Installation license registry
//!
//! A license is keyed by (extensionId, installationId). The first
//! verification creates it; later ones only refresh `updatedAt`.

use bson::Bson;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::schemas::{LicenseDoc, LICENSE_COLLECTION};
use crate::db::SharedMongo;
use crate::types::Result;

/// Outcome of registering an installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// No record existed; one was inserted with `verified = true`
    Created,
    /// An existing record had its `updatedAt` refreshed
    Touched,
}

impl Registration {
    /// Map an upsert's `upserted_id` to the outcome
    pub fn from_upserted_id(upserted_id: Option<&Bson>) -> Self {
        if upserted_id.is_some() {
            Self::Created
        } else {
            Self::Touched
        }
    }
}

/// Storage for license records
#[async_trait::async_trait]
pub trait LicenseStore: Send + Sync {
    /// Create the record for the pair, or refresh its `updatedAt`
    async fn register(
        &self,
        extension_id: &str,
        installation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Registration>;
}

/// MongoDB-backed license store
///
/// Registration is a single upsert, so two concurrent first verifications of
/// the same pair cannot both insert.
pub struct MongoLicenseStore {
    mongo: Arc<SharedMongo>,
}

impl MongoLicenseStore {
    pub fn new(mongo: Arc<SharedMongo>) -> Self {
        Self { mongo }
    }
}

#[async_trait::async_trait]
impl LicenseStore for MongoLicenseStore {
    async fn register(
        &self,
        extension_id: &str,
        installation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        let collection = self
            .mongo
            .client()
            .await?
            .collection::<LicenseDoc>(LICENSE_COLLECTION);

        let result = collection
            .upsert_one(
                LicenseDoc::identity_filter(extension_id, installation_id),
                LicenseDoc::registration_update(now),
            )
            .await?;

        Ok(Registration::from_upserted_id(result.upserted_id.as_ref()))
    }
}
