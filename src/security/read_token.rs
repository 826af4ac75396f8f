use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use super::signature;

/// Token format: `pp_read_<base64url(JSON claims)>.<hex HMAC of the base64url segment>`
pub const READ_TOKEN_PREFIX: &str = "pp_read_";

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    #[serde(rename = "formId")]
    form_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Issue a read token scoped to one form, expiring `ttl_secs` from now.
///
/// Tokens are self-contained: the connector never stores them, and validity
/// is entirely a function of the signature and the embedded expiry.
pub fn issue(form_id: &str, ttl_secs: i64, secret: &str) -> String {
    let claims = TokenClaims {
        form_id: form_id.to_string(),
        exp: Some(Utc::now().timestamp() + ttl_secs),
    };
    let payload =
        serde_json::to_vec(&claims).expect("token claims serialize to JSON unconditionally");
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
    let sig = signature::sign(payload_b64.as_bytes(), secret);

    format!("{READ_TOKEN_PREFIX}{payload_b64}.{sig}")
}

/// Verify a read token against the form it claims to grant access to.
///
/// A token for form A must never authorize reads of form B.
pub fn verify(token: &str, expected_form_id: &str, secret: &str) -> bool {
    verify_at(token, expected_form_id, secret, Utc::now())
}

pub fn verify_at(
    token: &str,
    expected_form_id: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> bool {
    let Some(raw) = token.strip_prefix(READ_TOKEN_PREFIX) else {
        return false;
    };

    let Some((payload_b64, sig_hex)) = raw.split_once('.') else {
        return false;
    };
    if payload_b64.is_empty() || sig_hex.is_empty() {
        return false;
    }

    // The signature covers the base64url segment, not the decoded JSON.
    let expected = signature::sign(payload_b64.as_bytes(), secret);
    if sig_hex.len() != expected.len() {
        return false;
    }
    if !bool::from(sig_hex.as_bytes().ct_eq(expected.as_bytes())) {
        return false;
    }

    let Ok(decoded) = URL_SAFE_NO_PAD.decode(payload_b64) else {
        return false;
    };
    let Ok(claims) = serde_json::from_slice::<TokenClaims>(&decoded) else {
        return false;
    };

    if let Some(exp) = claims.exp {
        if now.timestamp() > exp {
            return false;
        }
    }

    claims.form_id == expected_form_id
}
