//! # Event Normalization
//!
//! Maps heterogeneous raw event representations into the canonical
//! [`NormalizedEvent`]. This module is the single translation seam between
//! the two ingestion paths: the webhook path carries GitHub webhook payloads
//! keyed by the `X-GitHub-Event` header, the polling path carries activity
//! feed records (`PushEvent`, `IssuesEvent`, ...) with a slightly different
//! payload shape.
//!
//! New ingestion paths only ever implement `raw -> NormalizedEvent` here;
//! filtering and dispatch logic are never duplicated per path.
//!
//! Unsupported event kinds normalize to `None` and are silently dropped,
//! never treated as errors. Missing optional payload fields (author, body,
//! urls) are tolerated throughout.

use crate::source::RawFeedEvent;
use crate::{EventKind, NormalizedEvent, RepoUrl};
use serde_json::Value;

/// Normalize a webhook payload keyed by the event-type header.
///
/// Returns `None` when the event kind has no renderer or when the payload
/// carries no repository URL to route on.
pub fn normalize_webhook(event_type: &str, payload: Value) -> Option<NormalizedEvent> {
    let kind = kind_from_webhook(event_type, &payload)?;
    let repository_url = repository_url_from_payload(&payload)?;
    let author = resolve_author(kind, &payload);

    // The webhook path never consults cursors, so no source event ID is
    // synthesized for it.
    Some(NormalizedEvent::new(
        repository_url,
        kind,
        author,
        None,
        payload,
    ))
}

/// Normalize an activity-feed record from the polling path.
///
/// Feed records omit the `repository` and `sender` payload blocks that
/// webhook payloads carry; they are injected from the record's own
/// `repo`/`actor` fields so the formatter sees one payload shape.
pub fn normalize_feed(event: &RawFeedEvent, repository: &RepoUrl) -> Option<NormalizedEvent> {
    let mut payload = event.payload.clone();

    if let Some(map) = payload.as_object_mut() {
        if !map.contains_key("repository") {
            let full_name = event
                .repo_name
                .clone()
                .unwrap_or_else(|| repository.display_name().to_string());
            map.insert(
                "repository".to_string(),
                serde_json::json!({
                    "html_url": repository.as_str(),
                    "full_name": full_name,
                }),
            );
        }

        if let Some(actor) = &event.actor {
            if !map.contains_key("sender") {
                map.insert("sender".to_string(), serde_json::json!({ "login": actor }));
            }
            if !map.contains_key("actor") {
                map.insert("actor".to_string(), serde_json::json!({ "login": actor }));
            }
        }
    }

    let kind = kind_from_feed(&event.kind, &payload)?;
    let author = resolve_author(kind, &payload);

    Some(NormalizedEvent::new(
        repository.clone(),
        kind,
        author,
        Some(event.id.clone()),
        payload,
    ))
}

// ============================================================================
// Kind mapping
// ============================================================================

/// Map a webhook event-type header to a kind, or `None` for kinds with no
/// registered renderer.
fn kind_from_webhook(event_type: &str, payload: &Value) -> Option<EventKind> {
    match event_type {
        "push" => Some(EventKind::Push),
        "issues" => Some(issue_kind(action(payload))),
        "issue_comment" => Some(EventKind::IssueComment),
        "pull_request" => Some(pull_request_kind(action(payload), payload)),
        "pull_request_review_comment" => Some(EventKind::PullRequestReviewComment),
        "workflow_run" => Some(EventKind::WorkflowRun),
        "create" => Some(EventKind::BranchOrTagCreated),
        _ => None,
    }
}

/// Map an activity-feed event-type string to a kind.
fn kind_from_feed(event_type: &str, payload: &Value) -> Option<EventKind> {
    match event_type {
        "PushEvent" => Some(EventKind::Push),
        "IssuesEvent" => Some(issue_kind(action(payload))),
        "IssueCommentEvent" => Some(EventKind::IssueComment),
        "PullRequestEvent" => Some(pull_request_kind(action(payload), payload)),
        "PullRequestReviewCommentEvent" => Some(EventKind::PullRequestReviewComment),
        "WorkflowRunEvent" => Some(EventKind::WorkflowRun),
        "CreateEvent" => Some(EventKind::BranchOrTagCreated),
        _ => None,
    }
}

fn action(payload: &Value) -> Option<&str> {
    payload.get("action").and_then(|a| a.as_str())
}

/// Unknown issue actions fold into `IssueEdited`; the formatter reads the raw
/// action string from the payload for copy.
fn issue_kind(action: Option<&str>) -> EventKind {
    match action {
        Some("opened") => EventKind::IssueOpened,
        Some("closed") => EventKind::IssueClosed,
        Some("reopened") => EventKind::IssueReopened,
        _ => EventKind::IssueEdited,
    }
}

/// A closed pull request whose `merged` flag is set was merged, not
/// abandoned; the two render differently and dedup identically.
fn pull_request_kind(action: Option<&str>, payload: &Value) -> EventKind {
    match action {
        Some("opened") => EventKind::PullRequestOpened,
        Some("closed") => {
            let merged = payload
                .get("pull_request")
                .and_then(|pr| pr.get("merged"))
                .and_then(|m| m.as_bool())
                .unwrap_or(false);
            if merged {
                EventKind::PullRequestMerged
            } else {
                EventKind::PullRequestClosed
            }
        }
        Some("reopened") => EventKind::PullRequestReopened,
        Some("review_requested") => EventKind::PullRequestReviewRequested,
        Some("synchronize") => EventKind::PullRequestSynchronized,
        _ => EventKind::PullRequestEdited,
    }
}

// ============================================================================
// Payload extraction
// ============================================================================

fn repository_url_from_payload(payload: &Value) -> Option<RepoUrl> {
    payload
        .get("repository")
        .and_then(|r| r.get("html_url"))
        .and_then(|u| u.as_str())
        .filter(|u| !u.is_empty())
        .map(RepoUrl::new)
}

/// Resolve the event author with the fixed precedence order.
///
/// Push-like events try `pusher.name`, `pusher.login`, `sender.login`,
/// `actor.login`; all other kinds try `sender.login` then `actor.login`.
/// First non-empty value wins; otherwise the author is absent.
fn resolve_author(kind: EventKind, payload: &Value) -> Option<String> {
    let candidates: &[&[&str]] = if kind.is_push_like() {
        &[
            &["pusher", "name"],
            &["pusher", "login"],
            &["sender", "login"],
            &["actor", "login"],
        ]
    } else {
        &[&["sender", "login"], &["actor", "login"]]
    };

    for path in candidates {
        let mut value = payload;
        for key in *path {
            match value.get(key) {
                Some(v) => value = v,
                None => {
                    value = &Value::Null;
                    break;
                }
            }
        }
        if let Some(s) = value.as_str() {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;
