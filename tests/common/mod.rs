#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use keygate::db::Database;
use keygate::email::{MailError, Mailer};
use keygate::jwt::TokenCodec;
use keygate::ServerConfig;
use tower::ServiceExt;
use url::Url;

/// Raw signing secret shared by tests (32 bytes).
pub const TEST_SECRET: &[u8] = b"test-signing-secret-32-bytes-ok!";

/// Mailer that records messages for assertions instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    /// (to, html_body) pairs in send order
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, _subject: &str, html_body: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), html_body.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub codec: TokenCodec,
    pub mailer: Arc<RecordingMailer>,
}

/// Create a test app backed by an in-memory database.
pub async fn test_app() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let mailer = Arc::new(RecordingMailer::default());

    let config = ServerConfig {
        db: db.clone(),
        signing_secret: TEST_SECRET.to_vec(),
        access_ttl_secs: 300,
        refresh_ttl_secs: 3600,
        public_origin: Url::parse("http://localhost:7300").expect("Invalid URL"),
        mailer: mailer.clone(),
    };

    TestApp {
        app: keygate::create_app(&config),
        db,
        codec: TokenCodec::new(TEST_SECRET, 300),
        mailer,
    }
}

/// Send a request and return the status plus the parsed JSON body
/// (Null when the body is empty).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, None, Some(body)).await
}

/// Register a user through the API and return (status, body).
pub async fn register(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
) -> (StatusCode, serde_json::Value) {
    post_json(
        app,
        "/api/auth/register",
        serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        }),
    )
    .await
}

/// Log in through the API and return (status, body).
pub async fn login(
    app: &Router,
    identifier: &str,
    password: &str,
) -> (StatusCode, serde_json::Value) {
    post_json(
        app,
        "/api/auth/login",
        serde_json::json!({
            "identifier": identifier,
            "password": password,
        }),
    )
    .await
}

/// Let spawned fire-and-forget tasks (email dispatch) run to completion.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}
