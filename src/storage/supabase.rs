use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{FindOptions, NewSubmission, Page, Storage, StorageError, StoredSubmission};

/// Supabase adapter, speaking PostgREST over HTTPS with the service key.
///
/// The target table is provisioned by the owner and must match the columns
/// the Postgres adapter creates: `submission_id` (unique), `form_id`,
/// `submitted_at`, `data`, `created_at`.
pub struct SupabaseStorage {
    url: String,
    service_key: String,
    table: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SupabaseRow {
    form_id: String,
    submission_id: String,
    submitted_at: Option<String>,
    data: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl SupabaseStorage {
    pub fn new(url: &str, service_key: &str, table: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            table: table.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

#[async_trait]
impl Storage for SupabaseStorage {
    async fn connect(&self) -> Result<(), StorageError> {
        // PostgREST is stateless; there is no connection to establish.
        tracing::info!("supabase storage initialized for table '{}'", self.table);
        Ok(())
    }

    async fn insert(&self, submission: &NewSubmission) -> Result<(), StorageError> {
        let body = json!({
            "submission_id": submission.submission_id,
            "form_id": submission.form_id,
            "submitted_at": submission.timestamp,
            "data": submission.data,
        });

        let resp = self
            .authorized(self.client.post(self.endpoint()))
            .query(&[("on_conflict", "submission_id")])
            .header("Prefer", "resolution=ignore-duplicates")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(StorageError::Backend(format!(
                "supabase insert failed: {status} {detail}"
            )));
        }

        tracing::info!("supabase storage saved submission {}", submission.submission_id);
        Ok(())
    }

    async fn find(&self, form_id: &str, options: FindOptions) -> Result<Page, StorageError> {
        let limit = options.capped_limit();

        let mut query = vec![
            ("select".to_string(), "*".to_string()),
            ("form_id".to_string(), format!("eq.{form_id}")),
            ("order".to_string(), "created_at.desc".to_string()),
            ("limit".to_string(), (limit + 1).to_string()),
        ];
        if let Some(cursor) = options.cursor {
            query.push(("created_at".to_string(), format!("lt.{}", cursor.to_rfc3339())));
        }

        let resp = self
            .authorized(self.client.get(self.endpoint()))
            .query(&query)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(StorageError::Backend(format!(
                "supabase find failed: {status} {detail}"
            )));
        }

        let rows: Vec<SupabaseRow> = resp.json().await?;

        let rows = rows
            .into_iter()
            .map(|row| StoredSubmission {
                form_id: row.form_id,
                submission_id: row.submission_id,
                timestamp: row.submitted_at,
                data: row.data,
                received_at: row.created_at,
            })
            .collect();

        Ok(super::page_from_rows(rows, limit as usize))
    }

    fn backend(&self) -> &'static str {
        "supabase"
    }
}
