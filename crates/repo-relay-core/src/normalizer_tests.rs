//! Tests for dual-path event normalization.

use super::*;
use crate::FilterCategory;
use serde_json::json;

fn webhook_push_payload() -> serde_json::Value {
    json!({
        "ref": "refs/heads/main",
        "repository": {
            "html_url": "https://github.com/owner/repo",
            "full_name": "owner/repo"
        },
        "pusher": { "name": "alice" },
        "sender": { "login": "alice-sender" },
        "commits": []
    })
}

#[test]
fn test_webhook_push_normalizes() {
    let event = normalize_webhook("push", webhook_push_payload()).unwrap();

    assert_eq!(event.kind, EventKind::Push);
    assert_eq!(event.category, FilterCategory::Push);
    assert_eq!(event.repository_url.as_str(), "https://github.com/owner/repo");
    assert_eq!(event.author.as_deref(), Some("alice"));
    assert!(event.source_event_id.is_none());
}

#[test]
fn test_unsupported_webhook_kind_is_dropped() {
    let payload = json!({
        "repository": { "html_url": "https://github.com/owner/repo" }
    });
    assert!(normalize_webhook("star", payload.clone()).is_none());
    assert!(normalize_webhook("watch", payload).is_none());
}

#[test]
fn test_missing_repository_url_is_dropped() {
    let payload = json!({ "ref": "refs/heads/main", "commits": [] });
    assert!(normalize_webhook("push", payload).is_none());

    let empty_url = json!({
        "repository": { "html_url": "" },
        "commits": []
    });
    assert!(normalize_webhook("push", empty_url).is_none());
}

#[test]
fn test_repository_url_trailing_slash_is_canonicalized() {
    let payload = json!({
        "repository": { "html_url": "https://github.com/owner/repo/" },
        "commits": []
    });
    let event = normalize_webhook("push", payload).unwrap();
    assert_eq!(event.repository_url.as_str(), "https://github.com/owner/repo");
}

#[test]
fn test_push_author_precedence() {
    // pusher.name wins over everything
    let event = normalize_webhook("push", webhook_push_payload()).unwrap();
    assert_eq!(event.author.as_deref(), Some("alice"));

    // pusher.login when name is absent
    let payload = json!({
        "repository": { "html_url": "https://github.com/owner/repo" },
        "pusher": { "login": "alice-login" },
        "sender": { "login": "alice-sender" }
    });
    let event = normalize_webhook("push", payload).unwrap();
    assert_eq!(event.author.as_deref(), Some("alice-login"));

    // sender.login when pusher is absent entirely
    let payload = json!({
        "repository": { "html_url": "https://github.com/owner/repo" },
        "sender": { "login": "alice-sender" }
    });
    let event = normalize_webhook("push", payload).unwrap();
    assert_eq!(event.author.as_deref(), Some("alice-sender"));

    // actor.login as the final fallback
    let payload = json!({
        "repository": { "html_url": "https://github.com/owner/repo" },
        "actor": { "login": "alice-actor" }
    });
    let event = normalize_webhook("push", payload).unwrap();
    assert_eq!(event.author.as_deref(), Some("alice-actor"));
}

#[test]
fn test_empty_author_fields_are_skipped() {
    let payload = json!({
        "repository": { "html_url": "https://github.com/owner/repo" },
        "pusher": { "name": "" },
        "sender": { "login": "bob" }
    });
    let event = normalize_webhook("push", payload).unwrap();
    assert_eq!(event.author.as_deref(), Some("bob"));
}

#[test]
fn test_author_absent_when_no_candidate_fields() {
    let payload = json!({
        "repository": { "html_url": "https://github.com/owner/repo" }
    });
    let event = normalize_webhook("push", payload).unwrap();
    assert!(event.author.is_none());
}

#[test]
fn test_non_push_author_ignores_pusher() {
    let payload = json!({
        "action": "opened",
        "repository": { "html_url": "https://github.com/owner/repo" },
        "pusher": { "name": "not-me" },
        "sender": { "login": "opener" },
        "issue": { "number": 1 }
    });
    let event = normalize_webhook("issues", payload).unwrap();
    assert_eq!(event.author.as_deref(), Some("opener"));
}

#[test]
fn test_issue_action_mapping() {
    let base = |action: &str| {
        json!({
            "action": action,
            "repository": { "html_url": "https://github.com/owner/repo" },
            "issue": { "number": 7 }
        })
    };

    let cases = [
        ("opened", EventKind::IssueOpened),
        ("closed", EventKind::IssueClosed),
        ("reopened", EventKind::IssueReopened),
        ("edited", EventKind::IssueEdited),
        // Unknown actions fold into Edited, staying renderable
        ("labeled", EventKind::IssueEdited),
    ];
    for (action, expected) in cases {
        let event = normalize_webhook("issues", base(action)).unwrap();
        assert_eq!(event.kind, expected, "action {action}");
        assert_eq!(event.category, FilterCategory::Issues);
    }
}

#[test]
fn test_pull_request_merged_vs_closed() {
    let payload = |merged: bool| {
        json!({
            "action": "closed",
            "repository": { "html_url": "https://github.com/owner/repo" },
            "pull_request": { "number": 3, "merged": merged }
        })
    };

    let merged = normalize_webhook("pull_request", payload(true)).unwrap();
    assert_eq!(merged.kind, EventKind::PullRequestMerged);

    let closed = normalize_webhook("pull_request", payload(false)).unwrap();
    assert_eq!(closed.kind, EventKind::PullRequestClosed);
}

#[test]
fn test_pull_request_synchronize_maps_to_synchronized() {
    let payload = json!({
        "action": "synchronize",
        "repository": { "html_url": "https://github.com/owner/repo" },
        "pull_request": { "number": 3 }
    });
    let event = normalize_webhook("pull_request", payload).unwrap();
    assert_eq!(event.kind, EventKind::PullRequestSynchronized);
    assert!(event.kind.edits_in_place());
}

#[test]
fn test_feed_event_normalizes_with_injection() {
    let repo = RepoUrl::new("https://github.com/owner/repo");
    let raw = RawFeedEvent {
        id: "4242".to_string(),
        kind: "IssuesEvent".to_string(),
        actor: Some("carol".to_string()),
        repo_name: Some("owner/repo".to_string()),
        payload: json!({
            "action": "opened",
            "issue": { "number": 5, "title": "crash" }
        }),
    };

    let event = normalize_feed(&raw, &repo).unwrap();
    assert_eq!(event.kind, EventKind::IssueOpened);
    assert_eq!(event.source_event_id.as_deref(), Some("4242"));
    assert_eq!(event.author.as_deref(), Some("carol"));

    // The repository block was injected for the formatter
    assert_eq!(
        event.payload["repository"]["full_name"].as_str(),
        Some("owner/repo")
    );
    assert_eq!(
        event.payload["repository"]["html_url"].as_str(),
        Some("https://github.com/owner/repo")
    );
}

#[test]
fn test_feed_injection_does_not_clobber_existing_blocks() {
    let repo = RepoUrl::new("https://github.com/owner/repo");
    let raw = RawFeedEvent {
        id: "1".to_string(),
        kind: "IssuesEvent".to_string(),
        actor: Some("injected".to_string()),
        repo_name: None,
        payload: json!({
            "action": "closed",
            "sender": { "login": "original" },
            "issue": { "number": 2 }
        }),
    };

    let event = normalize_feed(&raw, &repo).unwrap();
    assert_eq!(event.author.as_deref(), Some("original"));
}

#[test]
fn test_feed_kind_mapping() {
    let repo = RepoUrl::new("https://github.com/owner/repo");
    let raw = |kind: &str| RawFeedEvent {
        id: "9".to_string(),
        kind: kind.to_string(),
        actor: None,
        repo_name: None,
        payload: json!({}),
    };

    assert_eq!(
        normalize_feed(&raw("PushEvent"), &repo).unwrap().kind,
        EventKind::Push
    );
    assert_eq!(
        normalize_feed(&raw("CreateEvent"), &repo).unwrap().kind,
        EventKind::BranchOrTagCreated
    );
    assert_eq!(
        normalize_feed(&raw("WorkflowRunEvent"), &repo).unwrap().kind,
        EventKind::WorkflowRun
    );
    // Feed kinds without a renderer are dropped
    assert!(normalize_feed(&raw("ForkEvent"), &repo).is_none());
    assert!(normalize_feed(&raw("WatchEvent"), &repo).is_none());
}
