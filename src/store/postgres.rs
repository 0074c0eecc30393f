//! PostgreSQL document store.
//!
//! Every collection shares one `documents` table; the record itself is kept in
//! a `jsonb` column (identifier included) and filters are translated into
//! JSONB operators. Unique indexes are expression indexes declared in
//! `sql/schema.sql`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    Connection, PgPool, Postgres, QueryBuilder, Row,
    postgres::PgPoolOptions,
    types::Json,
};
use std::time::Duration;
use tracing::{Instrument, error, info_span};
use uuid::Uuid;

use super::{
    Condition, DocumentStore, Filter, StoreError, UNIQUE_FIELDS, document::Document,
    prepare_insert,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect a small pool to `dsn`.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the database cannot be reached.
    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `documents` table and its indexes if they do not exist.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] or [`StoreError::WriteFailed`] if a statement fails.
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE",
            db.statement = "sql/schema.sql"
        );
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| map_write_error("documents", err))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn create(&self, collection: &str, record: &Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4();
        let stored = prepare_insert(record, &id.to_string(), Utc::now());

        let query = "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query,
            db.collection = collection
        );
        sqlx::query(query)
            .bind(collection)
            .bind(id)
            .bind(Json(stored))
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| map_write_error(collection, err))?;

        Ok(id.to_string())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let mut builder = select_builder(collection, filter, limit);
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = builder.sql(),
            db.collection = collection
        );
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| map_query_error(collection, err))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Json<Document>, _>("body")
                    .map(|Json(body)| body)
                    .map_err(|err| StoreError::Decode {
                        collection: collection.to_string(),
                        reason: err.to_string(),
                    })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        conn.ping().instrument(span).await.map_err(|err| {
            error!("Failed to ping database: {}", err);
            StoreError::Unavailable(err.to_string())
        })
    }

    fn backend(&self) -> &'static str {
        "postgresql"
    }
}

fn select_builder<'a>(collection: &'a str, filter: &'a Filter, limit: usize) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new("SELECT body FROM documents WHERE collection = ");
    builder.push_bind(collection);

    for (field, condition) in filter.conditions() {
        match condition {
            Condition::Eq(value) => {
                builder.push(" AND ((body -> ");
                builder.push_bind(field.as_str());
                builder.push(") = ");
                builder.push_bind(Json(value));
                builder.push(" OR (body -> ");
                builder.push_bind(field.as_str());
                builder.push(") @> jsonb_build_array(");
                builder.push_bind(Json(value));
                builder.push("))");
            }
            Condition::In(values) => {
                builder.push(" AND EXISTS (SELECT 1 FROM jsonb_array_elements(");
                builder.push_bind(Json(values));
                builder.push(") AS candidate(value) WHERE (body -> ");
                builder.push_bind(field.as_str());
                builder.push(") = candidate.value OR (body -> ");
                builder.push_bind(field.as_str());
                builder.push(") @> jsonb_build_array(candidate.value))");
            }
            Condition::ContainsInsensitive(needle) => {
                builder.push(" AND (body ->> ");
                builder.push_bind(field.as_str());
                builder.push(") ILIKE ");
                builder.push_bind(format!("%{}%", escape_like(needle)));
            }
        }
    }

    builder.push(" LIMIT ");
    builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    builder
}

/// Escape `LIKE` wildcards so the needle is matched literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn is_unavailable(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

/// Map an index name such as `documents_user_email_key` back to its field.
fn unique_field(collection: &str, constraint: &str) -> Option<&'static str> {
    UNIQUE_FIELDS
        .iter()
        .find(|(indexed, field)| {
            *indexed == collection && constraint == format!("documents_{indexed}_{field}_key")
        })
        .map(|(_, field)| *field)
}

fn map_write_error(collection: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        let field = match &err {
            sqlx::Error::Database(db_err) => db_err
                .constraint()
                .and_then(|name| unique_field(collection, name)),
            _ => None,
        };
        return StoreError::DuplicateKey {
            collection: collection.to_string(),
            field: field.unwrap_or("unknown").to_string(),
        };
    }
    if is_unavailable(&err) {
        return StoreError::Unavailable(err.to_string());
    }
    StoreError::WriteFailed {
        collection: collection.to_string(),
        reason: err.to_string(),
    }
}

fn map_query_error(collection: &str, err: sqlx::Error) -> StoreError {
    if is_unavailable(&err) {
        return StoreError::Unavailable(err.to_string());
    }
    StoreError::QueryFailed {
        collection: collection.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("azores"), "azores");
    }

    #[test]
    fn unique_field_maps_known_indexes() {
        assert_eq!(unique_field("user", "documents_user_email_key"), Some("email"));
        assert_eq!(
            unique_field("session", "documents_session_token_hash_key"),
            Some("token_hash")
        );
        assert_eq!(unique_field("user", "documents_pkey"), None);
    }

    #[test]
    fn select_builder_binds_every_condition() {
        let filter = Filter::new()
            .eq("guide_id", "g-1")
            .one_of("tags", ["eco"])
            .contains_ignore_case("location", "azores");
        let builder = select_builder("guide", &filter, 100);
        let sql = builder.sql();

        assert!(sql.starts_with("SELECT body FROM documents WHERE collection = $1"));
        assert!(sql.contains("jsonb_array_elements"));
        assert!(sql.contains("ILIKE"));
        assert!(sql.ends_with("LIMIT $11"));
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(is_unavailable(&sqlx::Error::PoolTimedOut));
        assert!(matches!(
            map_query_error("trip", sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_write_error("trip", sqlx::Error::RowNotFound),
            StoreError::WriteFailed { .. }
        ));
    }
}
