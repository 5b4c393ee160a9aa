//! MongoDB client and collection wrapper
//!
//! `SharedMongo` is the process-wide handle: the client is created on first
//! use and every later caller reuses it.

use bson::{doc, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::db::schemas::{AnalyticsEventDoc, LicenseDoc, ANALYTICS_COLLECTION, LICENSE_COLLECTION};
use crate::types::RelayError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client and verify it with a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, RelayError> {
        info!("Connecting to MongoDB database '{}'", db_name);

        // Fail fast instead of hanging a request on an unreachable server
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| RelayError::Storage(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| RelayError::Storage(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub fn collection<T>(&self, name: &str) -> MongoCollection<T>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync,
    {
        MongoCollection {
            inner: self.client.database(&self.db_name).collection::<T>(name),
        }
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Close the connection pool
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

/// Typed MongoDB collection
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    /// Apply schema-defined indexes
    pub async fn apply_indexes(&self) -> Result<(), RelayError>
    where
        T: IntoIndexes,
    {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| RelayError::Storage(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document
    pub async fn insert_one(&self, item: T) -> Result<(), RelayError> {
        self.inner
            .insert_one(item)
            .await
            .map_err(|e| RelayError::Storage(format!("Insert failed: {}", e)))?;
        Ok(())
    }

    /// Update one document, inserting it when nothing matches
    pub async fn upsert_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, RelayError> {
        self.inner
            .update_one(filter, update)
            .upsert(true)
            .await
            .map_err(|e| RelayError::Storage(format!("Upsert failed: {}", e)))
    }
}

/// Lazily connected, process-wide MongoDB handle
///
/// Concurrent first callers coalesce into a single connection attempt. A
/// failed attempt leaves the cell empty so the next caller tries again.
pub struct SharedMongo {
    uri: String,
    db_name: String,
    cell: OnceCell<MongoClient>,
}

impl SharedMongo {
    pub fn new(uri: impl Into<String>, db_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            db_name: db_name.into(),
            cell: OnceCell::new(),
        }
    }

    /// Get the client, connecting on first use
    pub async fn client(&self) -> Result<&MongoClient, RelayError> {
        self.cell
            .get_or_try_init(|| async {
                let client = MongoClient::new(&self.uri, &self.db_name).await?;
                ensure_indexes(&client).await;
                Ok::<_, RelayError>(client)
            })
            .await
    }

    /// Whether a connection has been established
    pub fn is_connected(&self) -> bool {
        self.cell.initialized()
    }

    /// Close the client if it was ever opened
    pub async fn shutdown(&self) {
        if let Some(client) = self.cell.get() {
            info!("Closing MongoDB connection to '{}'", client.db_name());
            client.clone().shutdown().await;
        }
    }
}

/// Create indexes for both collections
///
/// Failures only warn: a legacy `licenses` collection may already hold
/// duplicate pairs, which blocks the unique index but not the service.
async fn ensure_indexes(client: &MongoClient) {
    if let Err(e) = client
        .collection::<AnalyticsEventDoc>(ANALYTICS_COLLECTION)
        .apply_indexes()
        .await
    {
        warn!("Analytics indexes not applied: {}", e);
    }

    if let Err(e) = client
        .collection::<LicenseDoc>(LICENSE_COLLECTION)
        .apply_indexes()
        .await
    {
        warn!("License indexes not applied: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_handle_starts_disconnected() {
        let shared = SharedMongo::new("mongodb://localhost:27017", "snap_solve");
        assert!(!shared.is_connected());
    }

    #[tokio::test]
    async fn test_shutdown_without_connection_is_noop() {
        let shared = SharedMongo::new("mongodb://localhost:27017", "snap_solve");
        shared.shutdown().await;
        assert!(!shared.is_connected());
    }
}
