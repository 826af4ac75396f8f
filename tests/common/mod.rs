use std::net::SocketAddr;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use postpipe_connector::config::{Config, StorageBackend};
use postpipe_connector::security::signature;
use postpipe_connector::storage;

pub const TEST_SECRET: &str = "test-connector-secret";

/// A running connector instance backed by the in-memory adapter.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST a raw body to the ingest endpoint, optionally with a signature header.
    pub async fn ingest_raw(&self, body: &str, signature: Option<&str>) -> (Value, StatusCode) {
        let mut req = self
            .client
            .post(self.url("/postpipe/ingest"))
            .header("content-type", "application/json")
            .body(body.to_string());
        if let Some(sig) = signature {
            req = req.header("x-postpipe-signature", sig);
        }
        let resp = req.send().await.expect("ingest request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Sign `body` with the test secret and submit it.
    pub async fn ingest_signed(&self, body: &str) -> (Value, StatusCode) {
        let sig = signature::sign(body.as_bytes(), TEST_SECRET);
        self.ingest_raw(body, Some(&sig)).await
    }

    /// GET the submissions page for a form, optionally with a bearer token.
    pub async fn fetch_submissions(
        &self,
        form_id: &str,
        token: Option<&str>,
        query: &str,
    ) -> (Value, StatusCode) {
        let mut req = self
            .client
            .get(self.url(&format!("/api/postpipe/forms/{form_id}/submissions{query}")));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.expect("fetch request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// A well-formed submission body with a fresh timestamp.
pub fn submission_body(form_id: &str, submission_id: &str) -> String {
    json!({
        "formId": form_id,
        "submissionId": submission_id,
        "timestamp": Utc::now().to_rfc3339(),
        "data": { "email": "jane@example.com", "message": "hello" },
    })
    .to_string()
}

/// Spawn a connector on a random port with the memory backend.
pub async fn spawn_app() -> TestApp {
    let config = Config {
        connector_id: "conn_test".to_string(),
        connector_secret: TEST_SECRET.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        max_body_size: 1_048_576,
        max_skew_secs: 300,
        log_level: "warn".to_string(),
        storage: StorageBackend::Memory,
    };

    let store = storage::from_config(&config.storage);
    store.connect().await.expect("memory storage connect failed");

    let app = postpipe_connector::build_app(store, config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
    }
}
