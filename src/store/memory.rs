//! In-process document store.
//!
//! Used when no database DSN is configured and by the test suites. Unique
//! indexes are checked under the same write lock as the insert, so concurrent
//! inserts of the same unique value cannot both succeed.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{DocumentStore, Filter, StoreError, UNIQUE_FIELDS, document::Document, prepare_insert};

pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unique: Vec<(String, String)>,
}

impl MemoryStore {
    /// Empty store enforcing the standard unique indexes.
    #[must_use]
    pub fn new() -> Self {
        UNIQUE_FIELDS
            .iter()
            .fold(Self::without_unique_indexes(), |store, (collection, field)| {
                store.with_unique_index(collection, field)
            })
    }

    /// Empty store without any unique index.
    #[must_use]
    pub fn without_unique_indexes() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            unique: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_unique_index(mut self, collection: &str, field: &str) -> Self {
        self.unique.push((collection.to_string(), field.to_string()));
        self
    }

    /// Number of records in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    fn unique_conflict(&self, collection: &str, existing: &[Document], record: &Document) -> Option<String> {
        self.unique
            .iter()
            .filter(|(indexed, _)| indexed == collection)
            .find_map(|(_, field)| {
                let value = record.get(field).filter(|value| !value.is_null())?;
                existing
                    .iter()
                    .any(|other| other.get(field) == Some(value))
                    .then(|| field.clone())
            })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    #[instrument(skip(self, record))]
    async fn create(&self, collection: &str, record: &Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let stored = prepare_insert(record, &id, Utc::now());

        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();

        if let Some(field) = self.unique_conflict(collection, records, &stored) {
            debug!("unique index rejected insert on {collection}.{field}");
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                field,
            });
        }

        records.push(stored);
        Ok(id)
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| filter.matches(record))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
