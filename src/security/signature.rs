use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `raw_body` under `secret`.
pub fn sign(raw_body: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex signature against the exact bytes received on the wire.
///
/// The message must be the literal raw body, before any JSON parsing.
/// Re-serializing a parsed payload changes whitespace and key order and
/// silently desyncs from the sender's signature.
pub fn verify(raw_body: &[u8], signature_hex: &str, secret: &str) -> bool {
    if raw_body.is_empty() || signature_hex.is_empty() || secret.is_empty() {
        return false;
    }

    let expected = sign(raw_body, secret);

    let candidate = signature_hex.as_bytes();
    let expected = expected.as_bytes();
    if candidate.len() != expected.len() {
        return false;
    }
    candidate.ct_eq(expected).into()
}
