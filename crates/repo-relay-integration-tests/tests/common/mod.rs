//! Common test utilities for repo-relay integration tests
//!
//! This module provides:
//! - A recording sink capturing every delivery with its dedup key and flags
//! - A scripted feed source serving pre-arranged pages per repository
//! - Webhook payload fixtures and signature helpers

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use repo_relay_core::{
    ChatId, DeliveryError, FetchError, MessageHandle, NotificationSink, RawFeedEvent,
    RepoEventsSource, RepoUrl,
};
use serde_json::json;
use sha2::Sha256;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const REPO_URL: &str = "https://github.com/owner/repo";

// ============================================================================
// Recording Sink
// ============================================================================

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct SentMessage {
    pub chat: ChatId,
    pub text: String,
    pub dedup_key: Option<String>,
    pub edit_if_exists: bool,
}

/// Sink fake capturing every delivery in order.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingSink {
    #[allow(dead_code)]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(
        &self,
        chat: ChatId,
        text: &str,
        dedup_key: Option<&str>,
        edit_if_exists: bool,
    ) -> Result<MessageHandle, DeliveryError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            chat,
            text: text.to_string(),
            dedup_key: dedup_key.map(str::to_string),
            edit_if_exists,
        });
        Ok(MessageHandle::new(sent.len() as i64))
    }
}

// ============================================================================
// Scripted Feed Source
// ============================================================================

/// Feed source serving scripted responses per repository, in order. Once a
/// repository's script is exhausted it serves empty pages.
#[derive(Default)]
pub struct ScriptedSource {
    pages: Mutex<HashMap<RepoUrl, VecDeque<Result<Vec<RawFeedEvent>, FetchError>>>>,
}

impl ScriptedSource {
    #[allow(dead_code)]
    pub fn push_page(&self, repo: &RepoUrl, page: Vec<RawFeedEvent>) {
        self.pages
            .lock()
            .unwrap()
            .entry(repo.clone())
            .or_default()
            .push_back(Ok(page));
    }

    #[allow(dead_code)]
    pub fn push_failure(&self, repo: &RepoUrl, error: FetchError) {
        self.pages
            .lock()
            .unwrap()
            .entry(repo.clone())
            .or_default()
            .push_back(Err(error));
    }
}

#[async_trait]
impl RepoEventsSource for ScriptedSource {
    async fn fetch_recent_events(&self, repo: &RepoUrl) -> Result<Vec<RawFeedEvent>, FetchError> {
        self.pages
            .lock()
            .unwrap()
            .get_mut(repo)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

#[allow(dead_code)]
pub fn push_webhook_body(author: &str) -> String {
    json!({
        "ref": "refs/heads/main",
        "repository": {
            "full_name": "owner/repo",
            "html_url": REPO_URL
        },
        "pusher": { "name": author },
        "commits": [
            { "id": "abc1234def00", "message": "change", "author": { "name": author } }
        ]
    })
    .to_string()
}

#[allow(dead_code)]
pub fn workflow_webhook_body(status: &str, conclusion: &str) -> String {
    json!({
        "action": if status == "completed" { "completed" } else { "requested" },
        "repository": {
            "full_name": "owner/repo",
            "html_url": REPO_URL
        },
        "workflow_run": {
            "id": 555,
            "name": "CI",
            "run_number": 12,
            "status": status,
            "conclusion": conclusion,
            "head_branch": "main",
            "html_url": "https://github.com/owner/repo/actions/runs/555",
            "actor": { "login": "ci-bot" }
        }
    })
    .to_string()
}

#[allow(dead_code)]
pub fn push_feed_record(id: &str, author: &str) -> RawFeedEvent {
    RawFeedEvent {
        id: id.to_string(),
        kind: "PushEvent".to_string(),
        actor: Some(author.to_string()),
        repo_name: Some("owner/repo".to_string()),
        payload: json!({
            "ref": "refs/heads/main",
            "commits": [
                { "id": format!("{id}0000000"), "message": format!("change {id}"),
                  "author": { "name": author } }
            ]
        }),
    }
}

#[allow(dead_code)]
pub fn issue_feed_record(id: &str, number: u64, author: &str) -> RawFeedEvent {
    RawFeedEvent {
        id: id.to_string(),
        kind: "IssuesEvent".to_string(),
        actor: Some(author.to_string()),
        repo_name: Some("owner/repo".to_string()),
        payload: json!({
            "action": "opened",
            "issue": {
                "number": number,
                "title": format!("issue {number}"),
                "body": "details"
            }
        }),
    }
}

#[allow(dead_code)]
pub fn fork_feed_record(id: &str) -> RawFeedEvent {
    RawFeedEvent {
        id: id.to_string(),
        kind: "ForkEvent".to_string(),
        actor: Some("someone".to_string()),
        repo_name: Some("owner/repo".to_string()),
        payload: json!({}),
    }
}

#[allow(dead_code)]
pub fn sign(secret: &str, body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
