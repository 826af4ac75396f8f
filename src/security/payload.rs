use serde_json::Value;

/// Structural check that a decoded submission carries its identity fields:
/// non-empty `formId` and `submissionId`, and a present `data` value.
///
/// Runs before signature verification as a cheap short-circuit for
/// obviously malformed traffic.
pub fn is_structurally_valid(payload: &Value) -> bool {
    let non_empty_str = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    };

    non_empty_str("formId")
        && non_empty_str("submissionId")
        && payload.get("data").is_some_and(|d| !d.is_null())
}
