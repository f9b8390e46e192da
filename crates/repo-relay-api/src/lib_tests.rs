//! Router-level tests exercising the webhook response contract.

use super::*;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use repo_relay_core::{
    ChatId, DeliveryError, GithubEventFormatter, InMemorySubscriptionStore, MessageHandle,
    NotificationSink, RepoUrl, SubscriptionStore,
};
use serde_json::json;
use sha2::Sha256;
use std::sync::Mutex;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(ChatId, String)>>,
}

impl RecordingSink {
    fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(
        &self,
        chat: ChatId,
        text: &str,
        _dedup_key: Option<&str>,
        _edit_if_exists: bool,
    ) -> Result<MessageHandle, DeliveryError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat, text.to_string()));
        Ok(MessageHandle::new(sent.len() as i64))
    }
}

struct Harness {
    router: Router,
    sink: Arc<RecordingSink>,
}

async fn harness(secret: Option<&str>) -> Harness {
    let store = Arc::new(InMemorySubscriptionStore::new());
    store
        .add_subscription(ChatId::new(1), &RepoUrl::new("https://github.com/owner/repo"))
        .await
        .unwrap();

    let sink = Arc::new(RecordingSink::default());
    let engine = Arc::new(DispatchEngine::new(
        store,
        sink.clone(),
        Arc::new(GithubEventFormatter::new()),
    ));

    let state = AppState::new(engine, secret.map(str::to_string));
    Harness {
        router: create_router(state),
        sink,
    }
}

fn webhook_request(event_type: Option<&str>, signature: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook/github")
        .header("content-type", "application/json");
    if let Some(event_type) = event_type {
        builder = builder.header("x-github-event", event_type);
    }
    if let Some(signature) = signature {
        builder = builder.header("x-hub-signature-256", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn sign(secret: &str, body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn push_body() -> String {
    json!({
        "ref": "refs/heads/main",
        "repository": {
            "full_name": "owner/repo",
            "html_url": "https://github.com/owner/repo"
        },
        "pusher": { "name": "alice" },
        "commits": [
            { "id": "abc1234def0", "message": "change", "author": { "name": "Alice" } }
        ]
    })
    .to_string()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness(None).await;

    let response = h
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_missing_event_header_is_rejected() {
    let h = harness(None).await;

    let response = h
        .router
        .oneshot(webhook_request(None, None, &push_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(h.sink.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let h = harness(None).await;

    let response = h
        .router
        .oneshot(webhook_request(Some("push"), None, "{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ping_returns_pong() {
    let h = harness(None).await;

    let response = h
        .router
        .oneshot(webhook_request(Some("ping"), None, r#"{"zen":"ok"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "pong");
}

#[tokio::test]
async fn test_push_event_is_dispatched() {
    let h = harness(None).await;

    let response = h
        .router
        .oneshot(webhook_request(Some("push"), None, &push_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = h.sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ChatId::new(1));
    assert!(sent[0].1.contains("owner/repo"));
}

#[tokio::test]
async fn test_unsupported_event_is_acknowledged() {
    let h = harness(None).await;

    let body = json!({
        "repository": { "html_url": "https://github.com/owner/repo" }
    })
    .to_string();
    let response = h
        .router
        .oneshot(webhook_request(Some("star"), None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(h.sink.sent().is_empty());
}

#[tokio::test]
async fn test_valid_signature_is_accepted() {
    let h = harness(Some("s3cret")).await;
    let body = push_body();

    let response = h
        .router
        .oneshot(webhook_request(Some("push"), Some(&sign("s3cret", &body)), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.sink.sent().len(), 1);
}

#[tokio::test]
async fn test_invalid_signature_is_rejected() {
    let h = harness(Some("s3cret")).await;
    let body = push_body();

    let response = h
        .router
        .oneshot(webhook_request(Some("push"), Some(&sign("wrong", &body)), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(h.sink.sent().is_empty());
}

#[tokio::test]
async fn test_missing_signature_is_rejected_when_secret_configured() {
    let h = harness(Some("s3cret")).await;

    let response = h
        .router
        .oneshot(webhook_request(Some("push"), None, &push_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signature_is_not_required_without_secret() {
    let h = harness(None).await;

    let response = h
        .router
        .oneshot(webhook_request(Some("push"), None, &push_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
