pub mod memory;
pub mod mongo;
pub mod postgres;
pub mod supabase;

pub use memory::MemoryStorage;
pub use mongo::MongoStorage;
pub use postgres::PostgresStorage;
pub use supabase::SupabaseStorage;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::StorageBackend;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// A submission accepted by the ingest pipeline, before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub form_id: String,
    pub submission_id: String,
    pub timestamp: String,
    pub data: serde_json::Value,
}

/// A stored submission as returned by `find`, with the storage-assigned
/// receive time used as the pagination sort key.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredSubmission {
    pub form_id: String,
    pub submission_id: String,
    pub timestamp: Option<String>,
    pub data: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct FindOptions {
    pub limit: i64,
    /// Exclusive upper bound on `received_at`, taken from the previous page.
    pub cursor: Option<DateTime<Utc>>,
}

impl FindOptions {
    /// Page size actually used, bounded no matter what the caller asked for.
    pub fn capped_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

#[derive(Debug)]
pub struct Page {
    pub data: Vec<StoredSubmission>,
    pub next_cursor: Option<String>,
}

#[derive(Debug)]
pub enum StorageError {
    Database(sqlx::Error),
    Document(mongodb::error::Error),
    Http(reqwest::Error),
    Backend(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Database(err) => write!(f, "database error: {err}"),
            StorageError::Document(err) => write!(f, "document store error: {err}"),
            StorageError::Http(err) => write!(f, "http error: {err}"),
            StorageError::Backend(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err)
    }
}

impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::Document(err)
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Http(err)
    }
}

/// Persistence behind the connector. One instance is selected from
/// configuration at startup and shared by all requests.
///
/// Inserts are idempotent on `submission_id` (first write wins), so a caller
/// retrying after a transport failure cannot create duplicates.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Establish and cache the underlying connection or pool. Idempotent.
    async fn connect(&self) -> Result<(), StorageError>;

    async fn insert(&self, submission: &NewSubmission) -> Result<(), StorageError>;

    /// Page through submissions for one form, newest first. A supplied
    /// cursor bounds the page to strictly earlier receive times, so pages
    /// never overlap.
    async fn find(&self, form_id: &str, options: FindOptions) -> Result<Page, StorageError>;

    fn backend(&self) -> &'static str;
}

pub fn from_config(backend: &StorageBackend) -> Arc<dyn Storage> {
    match backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::Mongo {
            uri,
            db_name,
            collection,
        } => Arc::new(MongoStorage::new(uri, db_name, collection)),
        StorageBackend::Postgres { uri, table } => Arc::new(PostgresStorage::new(uri, table)),
        StorageBackend::Supabase {
            url,
            service_key,
            table,
        } => Arc::new(SupabaseStorage::new(url, service_key, table)),
    }
}

/// Turn up to `limit + 1` fetched rows into a page. The extra row only
/// signals that a further page exists; it is never returned.
pub(crate) fn page_from_rows(mut rows: Vec<StoredSubmission>, limit: usize) -> Page {
    let has_next = rows.len() > limit;
    rows.truncate(limit);

    let next_cursor = if has_next {
        rows.last().map(|s| s.received_at.to_rfc3339())
    } else {
        None
    };

    Page {
        data: rows,
        next_cursor,
    }
}
