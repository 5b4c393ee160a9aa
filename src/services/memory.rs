//! In-process store for local runs and tests
//!
//! Implements both [`EventStore`] and [`LicenseStore`] on plain vectors.
//! Writes can be made to fail to exercise error paths.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::db::schemas::{AnalyticsEventDoc, LicenseDoc};
use crate::services::licensing::{LicenseStore, Registration};
use crate::services::telemetry::EventStore;
use crate::types::{RelayError, Result};

#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<Vec<AnalyticsEventDoc>>,
    licenses: Mutex<Vec<LicenseDoc>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a storage error
    pub fn with_failure(self, failing: bool) -> Self {
        self.failing.store(failing, Ordering::SeqCst);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<AnalyticsEventDoc> {
        self.events.lock().await.clone()
    }

    pub async fn licenses(&self) -> Vec<LicenseDoc> {
        self.licenses.lock().await.clone()
    }

    pub async fn find_license(
        &self,
        extension_id: &str,
        installation_id: &str,
    ) -> Option<LicenseDoc> {
        self.licenses
            .lock()
            .await
            .iter()
            .find(|l| l.matches(extension_id, installation_id))
            .cloned()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RelayError::Storage("memory store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryStore {
    async fn append(&self, event: AnalyticsEventDoc) -> Result<()> {
        self.check_available()?;
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[async_trait::async_trait]
impl LicenseStore for MemoryStore {
    async fn register(
        &self,
        extension_id: &str,
        installation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        self.check_available()?;

        // Lookup and insert happen under one lock, same as the Mongo upsert
        let mut licenses = self.licenses.lock().await;
        match licenses
            .iter_mut()
            .find(|l| l.matches(extension_id, installation_id))
        {
            Some(existing) => {
                existing.updated_at = now;
                Ok(Registration::Touched)
            }
            None => {
                licenses.push(LicenseDoc::new(
                    extension_id.to_string(),
                    installation_id.to_string(),
                    now,
                ));
                Ok(Registration::Created)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_then_touch() {
        let store = MemoryStore::new();
        let first = Utc::now();
        let later = first + Duration::seconds(5);

        assert_eq!(
            store.register("ext1", "inst1", first).await.unwrap(),
            Registration::Created
        );
        assert_eq!(
            store.register("ext1", "inst1", later).await.unwrap(),
            Registration::Touched
        );

        let licenses = store.licenses().await;
        assert_eq!(licenses.len(), 1);
        assert_eq!(licenses[0].created_at, first);
        assert_eq!(licenses[0].updated_at, later);
        assert!(licenses[0].verified);
    }

    #[tokio::test]
    async fn test_pairs_are_distinct() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.register("ext1", "inst1", now).await.unwrap();
        store.register("ext1", "inst2", now).await.unwrap();
        store.register("ext2", "inst1", now).await.unwrap();
        assert_eq!(store.licenses().await.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_first_registration_creates_one_record() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();

        let outcomes = futures::future::join_all((0..16).map(|_| {
            let store = Arc::clone(&store);
            async move { store.register("ext1", "inst1", now).await.unwrap() }
        }))
        .await;

        let created = outcomes
            .iter()
            .filter(|o| **o == Registration::Created)
            .count();
        assert_eq!(created, 1);
        assert_eq!(store.licenses().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_store_rejects_writes() {
        let store = MemoryStore::new().with_failure(true);
        let event = AnalyticsEventDoc::new("e".into(), None, "ext1".into(), Utc::now());
        assert!(matches!(
            store.append(event).await,
            Err(RelayError::Storage(_))
        ));
        assert!(store.register("ext1", "inst1", Utc::now()).await.is_err());
        assert!(store.events().await.is_empty());
        assert!(store.licenses().await.is_empty());

        store.set_failing(false);
        assert_eq!(
            store.register("ext1", "inst1", Utc::now()).await.unwrap(),
            Registration::Created
        );
    }
}
