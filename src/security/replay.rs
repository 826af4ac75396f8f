use chrono::{DateTime, Utc};

pub const DEFAULT_MAX_SKEW_SECS: i64 = 300;

/// Whether a claimed submission timestamp is within the replay window.
///
/// The signature itself never expires, so this bounds how long a captured
/// request can be resent. Unparseable timestamps fail closed.
pub fn is_fresh(claimed_timestamp: &str, now: DateTime<Utc>, max_skew_secs: i64) -> bool {
    let Ok(claimed) = DateTime::parse_from_rfc3339(claimed_timestamp) else {
        return false;
    };

    let skew = (now - claimed.with_timezone(&Utc)).num_seconds().abs();
    skew <= max_skew_secs
}
