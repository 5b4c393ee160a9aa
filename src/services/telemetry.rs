//! Usage event persistence
//!
//! Events are append-only and written best-effort: callers log and discard
//! the error instead of surfacing it.

use std::sync::Arc;

use crate::db::schemas::{AnalyticsEventDoc, ANALYTICS_COLLECTION};
use crate::db::SharedMongo;
use crate::types::Result;

/// Append-only sink for analytics events
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event
    async fn append(&self, event: AnalyticsEventDoc) -> Result<()>;
}

/// MongoDB-backed event store
pub struct MongoEventStore {
    mongo: Arc<SharedMongo>,
}

impl MongoEventStore {
    pub fn new(mongo: Arc<SharedMongo>) -> Self {
        Self { mongo }
    }
}

#[async_trait::async_trait]
impl EventStore for MongoEventStore {
    async fn append(&self, event: AnalyticsEventDoc) -> Result<()> {
        self.mongo
            .client()
            .await?
            .collection::<AnalyticsEventDoc>(ANALYTICS_COLLECTION)
            .insert_one(event)
            .await
    }
}
