//! Document access layer shared by authentication and the domain routes.
//!
//! Records are JSON objects grouped in named collections. A backend only has
//! to provide atomic single-record inserts, filtered reads and a liveness
//! probe; identifiers and timestamps are stamped here so every backend
//! produces the same record shape.

mod document;
mod filter;
mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub use document::{
    CREATED_AT_FIELD, Document, ID_FIELD, INTERNAL_ID_FIELD, UPDATED_AT_FIELD, date, date_value,
    parse_date, serialize, serialize_all,
};
pub use filter::{Condition, Filter};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Unique indexes every backend enforces, as `(collection, field)`.
pub const UNIQUE_FIELDS: &[(&str, &str)] = &[("user", "email"), ("session", "token_hash")];

/// Store handle injected into every component that touches persistence.
pub type SharedStore = Arc<dyn DocumentStore>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to write to collection {collection}: {reason}")]
    WriteFailed { collection: String, reason: String },

    #[error("failed to query collection {collection}: {reason}")]
    QueryFailed { collection: String, reason: String },

    #[error("duplicate value for unique field {field} in collection {collection}")]
    DuplicateKey { collection: String, field: String },

    #[error("malformed record in collection {collection}: {reason}")]
    Decode { collection: String, reason: String },
}

impl StoreError {
    #[must_use]
    pub fn is_duplicate_key(&self, field: &str) -> bool {
        matches!(self, Self::DuplicateKey { field: f, .. } if f == field)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert `record` into `collection` and return the store-assigned identifier.
    ///
    /// The caller's record is never modified; the stored copy additionally
    /// carries `_id`, `created_at` and `updated_at`.
    async fn create(&self, collection: &str, record: &Document) -> Result<String, StoreError>;

    /// Return up to `limit` records of `collection` matching every condition of
    /// `filter`. Order is unspecified.
    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}

/// Fetch the first record matching `filter`, decoded into `T`.
///
/// # Errors
/// Returns the store error, or [`StoreError::Decode`] if the record does not fit `T`.
pub async fn find_one<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
) -> Result<Option<T>, StoreError> {
    let mut records = store.query(collection, filter, 1).await?;
    match records.pop() {
        Some(record) => from_document(collection, record).map(Some),
        None => Ok(None),
    }
}

/// Convert a typed value into a document.
///
/// # Errors
/// Returns [`StoreError::WriteFailed`] if `value` does not serialize to a JSON object.
pub fn to_document<T: Serialize>(collection: &str, value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::WriteFailed {
            collection: collection.to_string(),
            reason: format!("expected a JSON object, got {other}"),
        }),
        Err(err) => Err(StoreError::WriteFailed {
            collection: collection.to_string(),
            reason: err.to_string(),
        }),
    }
}

/// Decode a stored document into a typed value.
///
/// # Errors
/// Returns [`StoreError::Decode`] if the document does not fit `T`.
pub fn from_document<T: DeserializeOwned>(
    collection: &str,
    record: Document,
) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(record)).map_err(|err| StoreError::Decode {
        collection: collection.to_string(),
        reason: err.to_string(),
    })
}

/// Build the stored copy of `record`: identifier plus timestamps, unless the
/// caller already provided them.
pub(crate) fn prepare_insert(record: &Document, id: &str, now: DateTime<Utc>) -> Document {
    let mut stored = record.clone();
    stored.insert(INTERNAL_ID_FIELD.to_string(), Value::String(id.to_string()));
    stored
        .entry(CREATED_AT_FIELD)
        .or_insert_with(|| date_value(now));
    stored
        .entry(UPDATED_AT_FIELD)
        .or_insert_with(|| date_value(now));
    stored
}
