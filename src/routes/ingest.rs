use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use serde_json::json;

use crate::security::{payload, replay, signature};
use crate::state::SharedState;
use crate::storage::NewSubmission;

pub const SIGNATURE_HEADER: &str = "x-postpipe-signature";

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

/// Inbound write path: structure → freshness → signature → insert, with an
/// early exit at each stage.
pub async fn ingest(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "Payload missing");
    }

    let Ok(decoded) = serde_json::from_slice::<serde_json::Value>(&body) else {
        return reject(StatusCode::BAD_REQUEST, "Invalid Payload Structure");
    };

    if !payload::is_structurally_valid(&decoded) {
        return reject(StatusCode::BAD_REQUEST, "Invalid Payload Structure");
    }

    let claimed_timestamp = decoded["timestamp"].as_str().unwrap_or_default();
    if !replay::is_fresh(claimed_timestamp, Utc::now(), state.config.max_skew_secs) {
        tracing::warn!("timestamp outside replay window: {claimed_timestamp:?}");
        return reject(StatusCode::UNAUTHORIZED, "Request Expired");
    }

    // Only the header signature over the exact wire bytes is trusted. A
    // legacy `signature` field inside the body is ignored entirely.
    let header_signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !signature::verify(&body, header_signature, &state.config.connector_secret) {
        tracing::warn!(
            "invalid signature for submission {:?}",
            decoded["submissionId"].as_str().unwrap_or_default()
        );
        return reject(StatusCode::UNAUTHORIZED, "Invalid Signature");
    }

    let submission = NewSubmission {
        form_id: decoded["formId"].as_str().unwrap_or_default().to_string(),
        submission_id: decoded["submissionId"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        timestamp: claimed_timestamp.to_string(),
        data: decoded["data"].clone(),
    };

    // The write runs on its own task: a client disconnect drops this handler
    // future, but an accepted submission must still reach the store.
    let storage = state.storage.clone();
    let record = submission.clone();
    let stored = tokio::spawn(async move { storage.insert(&record).await }).await;

    match stored {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "stored": true })),
        )
            .into_response(),
        Ok(Err(e)) => {
            tracing::error!(
                "failed to store submission {} for form {}: {e}",
                submission.submission_id,
                submission.form_id
            );
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
        Err(e) => {
            tracing::error!("storage task failed: {e}");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}
