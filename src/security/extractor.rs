use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::SharedState;

/// Raw bearer credential from the Authorization header.
///
/// Scope verification happens in the handler, where the target form id is
/// known; this extractor only rejects requests with no usable credential.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl FromRequestParts<SharedState> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .ok_or_else(|| AppError::Unauthorized("Missing or invalid token".to_string()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Missing or invalid token".to_string()))?;

        Ok(BearerToken(token.to_string()))
    }
}
