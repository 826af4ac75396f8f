use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;

use super::{FindOptions, NewSubmission, Page, Storage, StorageError, StoredSubmission};

pub struct PostgresStorage {
    uri: String,
    table: String,
    pool: OnceCell<PgPool>,
}

impl PostgresStorage {
    pub fn new(uri: &str, table: &str) -> Self {
        Self {
            uri: uri.to_string(),
            table: table.to_string(),
            pool: OnceCell::new(),
        }
    }

    /// Create the pool on first use and ensure the target table exists.
    /// The table is owner-provisioned infrastructure, so auto-migration on
    /// connect is acceptable here.
    async fn pool(&self) -> Result<&PgPool, StorageError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(&self.uri)
                    .await?;

                sqlx::query(&format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                        submission_id TEXT UNIQUE NOT NULL,
                        form_id TEXT NOT NULL,
                        submitted_at TEXT,
                        data JSONB NOT NULL,
                        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
                    )",
                    table = self.table
                ))
                .execute(&pool)
                .await?;

                sqlx::query(&format!(
                    "CREATE INDEX IF NOT EXISTS {table}_form_created_idx
                     ON {table} (form_id, created_at DESC)",
                    table = self.table
                ))
                .execute(&pool)
                .await?;

                tracing::info!("postgres storage connected, table '{}' verified", self.table);
                Ok::<_, StorageError>(pool)
            })
            .await
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn connect(&self) -> Result<(), StorageError> {
        self.pool().await.map(|_| ())
    }

    async fn insert(&self, submission: &NewSubmission) -> Result<(), StorageError> {
        let pool = self.pool().await?;

        sqlx::query(&format!(
            "INSERT INTO {table} (submission_id, form_id, submitted_at, data)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (submission_id) DO NOTHING",
            table = self.table
        ))
        .bind(&submission.submission_id)
        .bind(&submission.form_id)
        .bind(&submission.timestamp)
        .bind(&submission.data)
        .execute(pool)
        .await?;

        tracing::info!("postgres storage saved submission {}", submission.submission_id);
        Ok(())
    }

    async fn find(&self, form_id: &str, options: FindOptions) -> Result<Page, StorageError> {
        let pool = self.pool().await?;
        let limit = options.capped_limit();

        let rows: Vec<StoredSubmission> = if let Some(cursor) = options.cursor {
            sqlx::query_as(&format!(
                "SELECT form_id, submission_id, submitted_at AS timestamp,
                        data, created_at AS received_at
                 FROM {table}
                 WHERE form_id = $1 AND created_at < $2
                 ORDER BY created_at DESC LIMIT $3",
                table = self.table
            ))
            .bind(form_id)
            .bind(cursor)
            .bind(limit + 1)
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as(&format!(
                "SELECT form_id, submission_id, submitted_at AS timestamp,
                        data, created_at AS received_at
                 FROM {table}
                 WHERE form_id = $1
                 ORDER BY created_at DESC LIMIT $2",
                table = self.table
            ))
            .bind(form_id)
            .bind(limit + 1)
            .fetch_all(pool)
            .await?
        };

        Ok(super::page_from_rows(rows, limit as usize))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
