use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection};
use tokio::sync::OnceCell;

use super::{FindOptions, NewSubmission, Page, Storage, StorageError, StoredSubmission};

pub struct MongoStorage {
    uri: String,
    db_name: String,
    collection: String,
    client: OnceCell<Client>,
}

impl MongoStorage {
    pub fn new(uri: &str, db_name: &str, collection: &str) -> Self {
        Self {
            uri: uri.to_string(),
            db_name: db_name.to_string(),
            collection: collection.to_string(),
            client: OnceCell::new(),
        }
    }

    async fn collection(&self) -> Result<Collection<Document>, StorageError> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let client = Client::with_uri_str(&self.uri).await?;
                tracing::info!("mongodb storage connected to {}", self.db_name);
                Ok::<_, StorageError>(client)
            })
            .await?;

        Ok(client.database(&self.db_name).collection(&self.collection))
    }
}

#[async_trait]
impl Storage for MongoStorage {
    async fn connect(&self) -> Result<(), StorageError> {
        self.collection().await.map(|_| ())
    }

    async fn insert(&self, submission: &NewSubmission) -> Result<(), StorageError> {
        let collection = self.collection().await?;

        let data = mongodb::bson::to_bson(&submission.data)
            .map_err(|e| StorageError::Backend(format!("bson encode failed: {e}")))?;

        // Upsert keyed on submissionId keeps retried writes idempotent; the
        // equality filter carries submissionId into the inserted document.
        let filter = doc! { "submissionId": submission.submission_id.as_str() };
        let update = doc! {
            "$setOnInsert": {
                "formId": submission.form_id.as_str(),
                "timestamp": submission.timestamp.as_str(),
                "data": data,
                "_receivedAt": Bson::DateTime(mongodb::bson::DateTime::now()),
            }
        };

        collection.update_one(filter, update).upsert(true).await?;
        tracing::info!("mongodb storage saved submission {}", submission.submission_id);
        Ok(())
    }

    async fn find(&self, form_id: &str, options: FindOptions) -> Result<Page, StorageError> {
        let collection = self.collection().await?;
        let limit = options.capped_limit();

        let mut filter = doc! { "formId": form_id };
        if let Some(cursor) = options.cursor {
            filter.insert(
                "_receivedAt",
                doc! { "$lt": Bson::DateTime(mongodb::bson::DateTime::from_millis(
                    cursor.timestamp_millis(),
                )) },
            );
        }

        let mut docs = collection
            .find(filter)
            .sort(doc! { "_receivedAt": -1 })
            .limit(limit + 1)
            .await?;

        let mut rows = Vec::new();
        while let Some(document) = docs.try_next().await? {
            match document_to_submission(&document) {
                Some(row) => rows.push(row),
                None => tracing::warn!("skipping malformed document in {}", self.collection),
            }
        }

        Ok(super::page_from_rows(rows, limit as usize))
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}

fn document_to_submission(document: &Document) -> Option<StoredSubmission> {
    let received = document.get_datetime("_receivedAt").ok()?;
    let received_at = DateTime::<Utc>::from_timestamp_millis(received.timestamp_millis())?;

    Some(StoredSubmission {
        form_id: document.get_str("formId").ok()?.to_string(),
        submission_id: document.get_str("submissionId").ok()?.to_string(),
        timestamp: document
            .get_str("timestamp")
            .ok()
            .map(|s| s.to_string()),
        data: document
            .get("data")
            .cloned()
            .map(Bson::into_relaxed_extjson)?,
        received_at,
    })
}
