use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::security::extractor::BearerToken;
use crate::security::read_token;
use crate::state::SharedState;
use crate::storage::{FindOptions, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

/// Outbound read path, authenticated by a read token scoped to the form in
/// the path.
pub async fn list(
    BearerToken(token): BearerToken,
    State(state): State<SharedState>,
    Path(form_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    // 403 rather than 401: a credential was presented, it just does not
    // grant access to this form.
    if !read_token::verify(&token, &form_id, &state.config.connector_secret) {
        return Err(AppError::Forbidden("Invalid token or scope".to_string()));
    }

    // Non-numeric or non-positive limits fall back to the default.
    let limit = params
        .limit
        .as_deref()
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_LIMIT);

    if limit > MAX_PAGE_LIMIT {
        return Err(AppError::BadRequest(format!(
            "Limit cannot exceed {MAX_PAGE_LIMIT}"
        )));
    }

    let cursor = match params.cursor.as_deref() {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| AppError::BadRequest("Invalid cursor".to_string()))?,
        ),
        None => None,
    };

    let page = state.storage.find(&form_id, FindOptions { limit, cursor }).await?;

    Ok(Json(json!({
        "formId": form_id,
        "count": page.data.len(),
        "data": page.data,
        "nextCursor": page.next_cursor,
    })))
}
