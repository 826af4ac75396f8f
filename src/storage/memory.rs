use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{FindOptions, NewSubmission, Page, Storage, StorageError, StoredSubmission};

/// Dry-run adapter. Holds submissions in process memory; everything is lost
/// on restart.
#[derive(Default)]
pub struct MemoryStorage {
    submissions: RwLock<Vec<StoredSubmission>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn connect(&self) -> Result<(), StorageError> {
        tracing::info!("memory storage ready (data will be lost on restart)");
        Ok(())
    }

    async fn insert(&self, submission: &NewSubmission) -> Result<(), StorageError> {
        let mut submissions = self.submissions.write().await;

        if submissions
            .iter()
            .any(|s| s.submission_id == submission.submission_id)
        {
            tracing::info!(
                "memory storage skipped duplicate submission {}",
                submission.submission_id
            );
            return Ok(());
        }

        submissions.push(StoredSubmission {
            form_id: submission.form_id.clone(),
            submission_id: submission.submission_id.clone(),
            timestamp: Some(submission.timestamp.clone()),
            data: submission.data.clone(),
            received_at: Utc::now(),
        });
        tracing::info!("memory storage saved submission {}", submission.submission_id);
        Ok(())
    }

    async fn find(&self, form_id: &str, options: FindOptions) -> Result<Page, StorageError> {
        let submissions = self.submissions.read().await;

        let limit = options.capped_limit() as usize;

        let mut rows: Vec<StoredSubmission> = submissions
            .iter()
            .filter(|s| s.form_id == form_id)
            .filter(|s| options.cursor.is_none_or(|cursor| s.received_at < cursor))
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        rows.truncate(limit + 1);

        Ok(super::page_from_rows(rows, limit))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
