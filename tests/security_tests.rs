use chrono::{Duration, Utc};
use serde_json::json;

use postpipe_connector::security::{payload, read_token, replay, signature};
use postpipe_connector::storage::{FindOptions, MemoryStorage, NewSubmission, Storage};

const SECRET: &str = "unit-test-secret";

// ── Signature verifier ──────────────────────────────────────────

#[test]
fn signature_roundtrip_verifies() {
    let body = br#"{"formId":"contact-us","data":{"a":1}}"#;
    let sig = signature::sign(body, SECRET);
    assert!(signature::verify(body, &sig, SECRET));
}

#[test]
fn signature_rejects_mutated_body() {
    let body = br#"{"formId":"contact-us","data":{"a":1}}"#;
    let sig = signature::sign(body, SECRET);
    let mutated = br#"{"formId":"contact-us","data":{"a":2}}"#;
    assert!(!signature::verify(mutated, &sig, SECRET));
}

#[test]
fn signature_rejects_mutated_signature() {
    let body = br#"{"formId":"contact-us"}"#;
    let mut sig = signature::sign(body, SECRET);
    // Flip the last hex digit
    let last = sig.pop().unwrap();
    sig.push(if last == '0' { '1' } else { '0' });
    assert!(!signature::verify(body, &sig, SECRET));
}

#[test]
fn signature_rejects_truncated_signature() {
    let body = br#"{"formId":"contact-us"}"#;
    let sig = signature::sign(body, SECRET);
    assert!(!signature::verify(body, &sig[..sig.len() - 2], SECRET));
}

#[test]
fn signature_rejects_empty_inputs() {
    let body = br#"{}"#;
    let sig = signature::sign(body, SECRET);
    assert!(!signature::verify(b"", &sig, SECRET));
    assert!(!signature::verify(body, "", SECRET));
}

#[test]
fn signature_depends_on_secret() {
    let body = br#"{"formId":"contact-us"}"#;
    let sig = signature::sign(body, "secret-a");
    assert!(!signature::verify(body, &sig, "secret-b"));
}

// ── Replay guard ────────────────────────────────────────────────

#[test]
fn replay_accepts_fresh_timestamp() {
    let now = Utc::now();
    assert!(replay::is_fresh(&now.to_rfc3339(), now, 300));
}

#[test]
fn replay_accepts_timestamp_within_window() {
    let now = Utc::now();
    let claimed = (now - Duration::seconds(200)).to_rfc3339();
    assert!(replay::is_fresh(&claimed, now, 300));
}

#[test]
fn replay_rejects_stale_timestamp() {
    let now = Utc::now();
    let claimed = (now - Duration::seconds(600)).to_rfc3339();
    assert!(!replay::is_fresh(&claimed, now, 300));
}

#[test]
fn replay_rejects_future_timestamp_beyond_window() {
    let now = Utc::now();
    let claimed = (now + Duration::seconds(600)).to_rfc3339();
    assert!(!replay::is_fresh(&claimed, now, 300));
}

#[test]
fn replay_rejects_unparseable_timestamp() {
    assert!(!replay::is_fresh("yesterday-ish", Utc::now(), 300));
    assert!(!replay::is_fresh("", Utc::now(), 300));
}

// ── Payload validator ───────────────────────────────────────────

#[test]
fn payload_accepts_complete_submission() {
    let payload = json!({
        "formId": "contact-us",
        "submissionId": "sub_1",
        "timestamp": "2026-08-06T12:00:00Z",
        "data": { "email": "a@b.c" },
    });
    assert!(payload::is_structurally_valid(&payload));
}

#[test]
fn payload_rejects_missing_or_empty_identity() {
    assert!(!payload::is_structurally_valid(&json!({
        "submissionId": "sub_1", "data": {},
    })));
    assert!(!payload::is_structurally_valid(&json!({
        "formId": "", "submissionId": "sub_1", "data": {},
    })));
    assert!(!payload::is_structurally_valid(&json!({
        "formId": "contact-us", "data": {},
    })));
}

#[test]
fn payload_rejects_absent_or_null_data() {
    assert!(!payload::is_structurally_valid(&json!({
        "formId": "contact-us", "submissionId": "sub_1",
    })));
    assert!(!payload::is_structurally_valid(&json!({
        "formId": "contact-us", "submissionId": "sub_1", "data": null,
    })));
}

// ── Read token codec ────────────────────────────────────────────

#[test]
fn token_roundtrip_verifies() {
    let token = read_token::issue("contact-us", 3600, SECRET);
    assert!(token.starts_with("pp_read_"));
    assert!(read_token::verify(&token, "contact-us", SECRET));
}

#[test]
fn token_scope_is_enforced() {
    let token = read_token::issue("contact-us", 3600, SECRET);
    assert!(!read_token::verify(&token, "newsletter", SECRET));
}

#[test]
fn token_expiry_is_enforced() {
    let token = read_token::issue("contact-us", 60, SECRET);
    let now = Utc::now();
    assert!(read_token::verify_at(&token, "contact-us", SECRET, now));
    assert!(!read_token::verify_at(
        &token,
        "contact-us",
        SECRET,
        now + Duration::seconds(61),
    ));
}

#[test]
fn token_rejects_wrong_secret() {
    let token = read_token::issue("contact-us", 3600, "secret-a");
    assert!(!read_token::verify(&token, "contact-us", "secret-b"));
}

#[test]
fn token_rejects_tampered_payload() {
    let token = read_token::issue("contact-us", 3600, SECRET);
    let raw = token.strip_prefix("pp_read_").unwrap();
    let (payload_b64, sig) = raw.split_once('.').unwrap();

    // Swap one payload character; the signature no longer matches
    let mut chars: Vec<char> = payload_b64.chars().collect();
    chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
    let tampered: String = chars.into_iter().collect();

    let token = format!("pp_read_{tampered}.{sig}");
    assert!(!read_token::verify(&token, "contact-us", SECRET));
}

#[test]
fn token_rejects_bad_shapes() {
    assert!(!read_token::verify("", "contact-us", SECRET));
    assert!(!read_token::verify("pp_read_", "contact-us", SECRET));
    assert!(!read_token::verify("pp_read_abc", "contact-us", SECRET));
    assert!(!read_token::verify("pp_read_abc.", "contact-us", SECRET));
    assert!(!read_token::verify("pp_read_.abc", "contact-us", SECRET));
    assert!(!read_token::verify("pp_write_abc.def", "contact-us", SECRET));
}

// ── Memory adapter pagination ───────────────────────────────────

fn submission(form_id: &str, submission_id: &str) -> NewSubmission {
    NewSubmission {
        form_id: form_id.to_string(),
        submission_id: submission_id.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        data: json!({ "n": submission_id }),
    }
}

#[tokio::test]
async fn memory_pagination_is_complete_and_ordered() {
    let store = MemoryStorage::new();

    for i in 0..7 {
        store
            .insert(&submission("contact-us", &format!("sub_{i}")))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    store.insert(&submission("other", "sub_x")).await.unwrap();

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = store
            .find("contact-us", FindOptions { limit: 3, cursor })
            .await
            .unwrap();

        // Descending receive order within the page
        for pair in page.data.windows(2) {
            assert!(pair[0].received_at > pair[1].received_at);
        }
        seen.extend(page.data.iter().map(|s| s.submission_id.clone()));

        match page.next_cursor {
            Some(next) => {
                cursor = Some(
                    chrono::DateTime::parse_from_rfc3339(&next)
                        .unwrap()
                        .with_timezone(&Utc),
                );
            }
            None => break,
        }
    }

    assert_eq!(
        seen,
        vec!["sub_6", "sub_5", "sub_4", "sub_3", "sub_2", "sub_1", "sub_0"]
    );
}

#[tokio::test]
async fn memory_find_without_next_page_has_no_cursor() {
    let store = MemoryStorage::new();
    for i in 0..3 {
        store
            .insert(&submission("contact-us", &format!("sub_{i}")))
            .await
            .unwrap();
    }

    let page = store
        .find(
            "contact-us",
            FindOptions {
                limit: 3,
                cursor: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(page.data.len(), 3);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn memory_insert_is_idempotent_on_submission_id() {
    let store = MemoryStorage::new();
    let record = submission("contact-us", "sub_same");

    store.insert(&record).await.unwrap();
    store.insert(&record).await.unwrap();

    let page = store
        .find(
            "contact-us",
            FindOptions {
                limit: 10,
                cursor: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
}
