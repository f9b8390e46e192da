//! # Event Formatting
//!
//! The [`EventFormatter`] capability renders a [`NormalizedEvent`] into
//! display text plus a dedup key, and the default [`GithubEventFormatter`]
//! implements it for the supported GitHub event kinds in Telegram-flavored
//! HTML.
//!
//! A formatter that declines an event (unsupported kind, uninteresting
//! action, malformed payload) returns `None`; the dispatch engine treats
//! that exactly like an unsupported kind — the event is skipped, the batch
//! continues.

use crate::{EventKind, NormalizedEvent};
use serde_json::Value;

/// How the rendered body will be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStyle {
    /// One event per message; the body names the repository.
    Standalone,
    /// Part of a grouped per-tick message whose headline already names the
    /// repository, so the per-event body omits it.
    Grouped,
}

/// Rendered notification content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEvent {
    /// Display text (Telegram HTML).
    pub text: String,
    /// Key identifying "the same logical notification" across repeated
    /// deliveries, for edit-in-place behavior.
    pub dedup_key: String,
}

/// Renders normalized events into chat messages.
pub trait EventFormatter: Send + Sync {
    /// Render an event, or `None` when this formatter declines it.
    fn render(&self, event: &NormalizedEvent, style: RenderStyle) -> Option<RenderedEvent>;
}

// ============================================================================
// Default GitHub formatter
// ============================================================================

/// Commits listed in a push message before eliding the remainder.
const PUSH_COMMIT_LIMIT: usize = 10;

/// Maximum characters of an issue/PR/comment body quoted in a message.
const BODY_PREVIEW_LIMIT: usize = 500;

/// Default formatter for GitHub events, producing Telegram HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct GithubEventFormatter;

impl GithubEventFormatter {
    /// Create the default formatter.
    pub fn new() -> Self {
        Self
    }
}

impl EventFormatter for GithubEventFormatter {
    fn render(&self, event: &NormalizedEvent, style: RenderStyle) -> Option<RenderedEvent> {
        let payload = &event.payload;
        match event.kind {
            EventKind::Push => render_push(payload, style),
            EventKind::IssueOpened
            | EventKind::IssueClosed
            | EventKind::IssueReopened
            | EventKind::IssueEdited => render_issue(payload, style),
            EventKind::IssueComment => render_issue_comment(payload, style),
            EventKind::PullRequestOpened
            | EventKind::PullRequestClosed
            | EventKind::PullRequestMerged
            | EventKind::PullRequestReopened
            | EventKind::PullRequestEdited
            | EventKind::PullRequestReviewRequested
            | EventKind::PullRequestSynchronized => render_pull_request(payload, style),
            EventKind::PullRequestReviewComment => render_review_comment(payload, style),
            EventKind::WorkflowRun => render_workflow_run(payload, style),
            EventKind::BranchOrTagCreated => render_created_ref(payload, style),
            EventKind::Other => None,
        }
    }
}

// ============================================================================
// Per-kind rendering
// ============================================================================

fn render_push(payload: &Value, style: RenderStyle) -> Option<RenderedEvent> {
    let repo_name = repo_full_name(payload);
    let git_ref = str_field(payload, &["ref"]).replace("refs/heads/", "");
    let pusher = push_author(payload);
    let compare_url = str_field(payload, &["compare"]);
    let commits = payload
        .get("commits")
        .and_then(|c| c.as_array())
        .cloned()
        .unwrap_or_default();

    let mut text = match style {
        RenderStyle::Standalone => format!("<b>Push to {repo_name}</b>\n"),
        RenderStyle::Grouped => "<b>Push</b>\n".to_string(),
    };
    text.push_str(&format!("Branch: <code>{git_ref}</code>\n"));
    text.push_str(&format!("Author: {pusher}\n\n"));

    if !commits.is_empty() {
        text.push_str(&format!("<b>Commits ({}):</b>\n", commits.len()));
        for commit in commits.iter().take(PUSH_COMMIT_LIMIT) {
            let sha: String = str_field(commit, &["id"]).chars().take(7).collect();
            let message = commit
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("")
                .lines()
                .next()
                .unwrap_or("");
            let message = truncate(message, 100);
            let author = commit
                .get("author")
                .and_then(|a| a.get("name"))
                .and_then(|n| n.as_str())
                .unwrap_or("Unknown");
            text.push_str(&format!("<code>{sha}</code> {message}\n{author}\n"));
        }
        if commits.len() > PUSH_COMMIT_LIMIT {
            text.push_str(&format!(
                "\n... and {} more commits\n",
                commits.len() - PUSH_COMMIT_LIMIT
            ));
        }
    }

    if !compare_url.is_empty() {
        text.push_str(&format!("\n<a href='{compare_url}'>Compare changes</a>"));
    }

    Some(RenderedEvent {
        text,
        dedup_key: format!("push:{repo_name}:{git_ref}"),
    })
}

fn render_issue(payload: &Value, style: RenderStyle) -> Option<RenderedEvent> {
    let repo_name = repo_full_name(payload);
    let action = str_field(payload, &["action"]);
    let sender = sender_login(payload);
    let number = u64_field(payload, &["issue", "number"]);
    let title = payload
        .get("issue")
        .and_then(|i| i.get("title"))
        .and_then(|t| t.as_str())
        .unwrap_or("No title");
    let url = str_field(payload, &["issue", "html_url"]);
    let body = str_field(payload, &["issue", "body"]);

    let action_text = match action.as_str() {
        "opened" => "Issue opened".to_string(),
        "closed" => "Issue closed".to_string(),
        "reopened" => "Issue reopened".to_string(),
        "edited" => "Issue edited".to_string(),
        other => format!("Issue: {other}"),
    };

    let mut text = format!("{action_text}\n");
    if style == RenderStyle::Standalone {
        text.push_str(&format!("<b>{repo_name}</b>\n"));
    }
    text.push('\n');
    text.push_str(&format!("<b>#{number}: {title}</b>\n{sender}\n\n"));

    if !body.is_empty() && action == "opened" {
        text.push_str(&format!(
            "<blockquote>{}</blockquote>\n",
            truncate(&body, BODY_PREVIEW_LIMIT)
        ));
    }

    if !url.is_empty() {
        text.push_str(&format!("\n<a href='{url}'>Open issue</a>"));
    }

    Some(RenderedEvent {
        text,
        dedup_key: format!("issue:{repo_name}:{number}"),
    })
}

fn render_issue_comment(payload: &Value, style: RenderStyle) -> Option<RenderedEvent> {
    // Only newly created comments are interesting; edits and deletions of
    // comments are noise.
    if str_field(payload, &["action"]) != "created" {
        return None;
    }

    let repo_name = repo_full_name(payload);
    let sender = sender_login(payload);
    let number = u64_field(payload, &["issue", "number"]);
    let title = str_field(payload, &["issue", "title"]);
    let body = str_field(payload, &["comment", "body"]);
    let url = str_field(payload, &["comment", "html_url"]);
    let comment_id = u64_field(payload, &["comment", "id"]);

    let mut text = "<b>New comment</b>\n".to_string();
    if style == RenderStyle::Standalone {
        text.push_str(&format!("{repo_name}\n"));
    }
    text.push('\n');
    text.push_str(&format!("<b>#{number}: {title}</b>\n{sender}\n\n"));

    if !body.is_empty() {
        text.push_str(&format!(
            "<blockquote>{}</blockquote>\n",
            truncate(&body, BODY_PREVIEW_LIMIT)
        ));
    }
    text.push_str(&format!("\n<a href='{url}'>Open comment</a>"));

    Some(RenderedEvent {
        text,
        dedup_key: format!("issue_comment:{repo_name}:{comment_id}"),
    })
}

fn render_pull_request(payload: &Value, style: RenderStyle) -> Option<RenderedEvent> {
    let repo_name = repo_full_name(payload);
    let action = str_field(payload, &["action"]);
    let sender = sender_login(payload);
    let pr = payload.get("pull_request");
    let number = u64_field(payload, &["pull_request", "number"]);
    let title = str_field(payload, &["pull_request", "title"]);
    let url = str_field(payload, &["pull_request", "html_url"]);
    let body = str_field(payload, &["pull_request", "body"]);
    let base = str_field(payload, &["pull_request", "base", "ref"]);
    let head = str_field(payload, &["pull_request", "head", "ref"]);
    let merged = pr
        .and_then(|p| p.get("merged"))
        .and_then(|m| m.as_bool())
        .unwrap_or(false);

    let action_text = match action.as_str() {
        "opened" => "New pull request".to_string(),
        "closed" if merged => "Pull request merged".to_string(),
        "closed" => "Pull request closed".to_string(),
        "reopened" => "Pull request reopened".to_string(),
        "edited" => "Pull request edited".to_string(),
        "review_requested" => "Review requested".to_string(),
        "synchronize" => "Pull request updated".to_string(),
        other => format!("Pull request: {other}"),
    };

    let mut text = format!("{action_text}\n");
    if style == RenderStyle::Standalone {
        text.push_str(&format!("<b>{repo_name}</b>\n"));
    }
    text.push('\n');
    text.push_str(&format!("<b>#{number}: {title}</b>\n{sender}\n"));
    text.push_str(&format!("{head} \u{2192} {base}\n\n"));

    if !body.is_empty() && action == "opened" {
        text.push_str(&format!(
            "<blockquote>{}</blockquote>\n",
            truncate(&body, BODY_PREVIEW_LIMIT)
        ));
    }

    let additions = u64_field(payload, &["pull_request", "additions"]);
    let deletions = u64_field(payload, &["pull_request", "deletions"]);
    let changed_files = u64_field(payload, &["pull_request", "changed_files"]);
    text.push_str(&format!(
        "\n+{additions} / -{deletions} | {changed_files} files\n"
    ));
    text.push_str(&format!("\n<a href='{url}'>Open pull request</a>"));

    Some(RenderedEvent {
        text,
        dedup_key: format!("pr:{repo_name}:{number}"),
    })
}

fn render_review_comment(payload: &Value, style: RenderStyle) -> Option<RenderedEvent> {
    if str_field(payload, &["action"]) != "created" {
        return None;
    }

    let repo_name = repo_full_name(payload);
    let sender = sender_login(payload);
    let number = u64_field(payload, &["pull_request", "number"]);
    let title = str_field(payload, &["pull_request", "title"]);
    let body = str_field(payload, &["comment", "body"]);
    let url = str_field(payload, &["comment", "html_url"]);
    let path = str_field(payload, &["comment", "path"]);
    let comment_id = u64_field(payload, &["comment", "id"]);

    let mut text = "<b>Code comment on pull request</b>\n".to_string();
    if style == RenderStyle::Standalone {
        text.push_str(&format!("{repo_name}\n"));
    }
    text.push('\n');
    text.push_str(&format!("<b>#{number}: {title}</b>\n{sender}\n{path}\n\n"));

    if !body.is_empty() {
        text.push_str(&format!(
            "<blockquote>{}</blockquote>\n",
            truncate(&body, BODY_PREVIEW_LIMIT)
        ));
    }
    text.push_str(&format!("\n<a href='{url}'>Open comment</a>"));

    Some(RenderedEvent {
        text,
        dedup_key: format!("pr_comment:{repo_name}:{comment_id}"),
    })
}

fn render_workflow_run(payload: &Value, style: RenderStyle) -> Option<RenderedEvent> {
    let repo_name = repo_full_name(payload);
    let action = str_field(payload, &["action"]);
    let run = payload.get("workflow_run");
    let name = run
        .and_then(|r| r.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("Unknown workflow");
    let status = str_field(payload, &["workflow_run", "status"]);
    let conclusion = str_field(payload, &["workflow_run", "conclusion"]);
    let url = str_field(payload, &["workflow_run", "html_url"]);
    let branch = str_field(payload, &["workflow_run", "head_branch"]);
    let actor = payload
        .get("workflow_run")
        .and_then(|r| r.get("actor"))
        .and_then(|a| a.get("login"))
        .and_then(|l| l.as_str())
        .unwrap_or("Unknown");
    let run_number = u64_field(payload, &["workflow_run", "run_number"]);
    let run_id = u64_field(payload, &["workflow_run", "id"]);

    // For completed runs the conclusion carries the outcome; while running,
    // the status does.
    let raw_state = if action == "completed" { &conclusion } else { &status };
    let status_text = match raw_state.as_str() {
        "success" => "Succeeded",
        "failure" => "Failed",
        "cancelled" => "Cancelled",
        "skipped" => "Skipped",
        "in_progress" => "In progress",
        "queued" => "Queued",
        other => other,
    };

    let mut text = "\u{2699} <b>GitHub Actions</b>\n".to_string();
    if style == RenderStyle::Standalone {
        text.push_str(&format!("{repo_name}\n"));
    }
    text.push('\n');
    text.push_str(&format!("<b>{name}</b> #{run_number}\n"));
    text.push_str(&format!("Branch: {branch}\n{actor}\n\n"));
    text.push_str(&format!("Status: {status_text}\n"));
    text.push_str(&format!("\n<a href='{url}'>Open workflow</a>"));

    Some(RenderedEvent {
        text,
        dedup_key: format!("workflow:{repo_name}:{run_id}"),
    })
}

fn render_created_ref(payload: &Value, style: RenderStyle) -> Option<RenderedEvent> {
    let repo_name = repo_full_name(payload);
    let git_ref = str_field(payload, &["ref"]);
    let ref_type = str_field(payload, &["ref_type"]);
    let sender = sender_login(payload);

    let headline = match ref_type.as_str() {
        "tag" => "Tag created",
        _ => "Branch created",
    };

    let mut text = format!("<b>{headline}</b>\n");
    if style == RenderStyle::Standalone {
        text.push_str(&format!("{repo_name}\n"));
    }
    text.push('\n');
    text.push_str(&format!("<code>{git_ref}</code>\n{sender}\n"));

    Some(RenderedEvent {
        text,
        dedup_key: format!("create:{repo_name}:{git_ref}"),
    })
}

// ============================================================================
// Payload helpers
// ============================================================================

fn repo_full_name(payload: &Value) -> String {
    payload
        .get("repository")
        .and_then(|r| r.get("full_name"))
        .and_then(|n| n.as_str())
        .unwrap_or("Unknown")
        .to_string()
}

fn sender_login(payload: &Value) -> String {
    payload
        .get("sender")
        .and_then(|s| s.get("login"))
        .and_then(|l| l.as_str())
        .unwrap_or("Unknown")
        .to_string()
}

fn push_author(payload: &Value) -> String {
    let pusher = payload.get("pusher");
    pusher
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            pusher
                .and_then(|p| p.get("login"))
                .and_then(|l| l.as_str())
                .filter(|s| !s.is_empty())
        })
        .or_else(|| {
            payload
                .get("sender")
                .and_then(|s| s.get("login"))
                .and_then(|l| l.as_str())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or("Unknown")
        .to_string()
}

fn str_field(payload: &Value, path: &[&str]) -> String {
    let mut value = payload;
    for key in path {
        match value.get(key) {
            Some(v) => value = v,
            None => return String::new(),
        }
    }
    value.as_str().unwrap_or("").to_string()
}

fn u64_field(payload: &Value, path: &[&str]) -> u64 {
    let mut value = payload;
    for key in path {
        match value.get(key) {
            Some(v) => value = v,
            None => return 0,
        }
    }
    value.as_u64().unwrap_or(0)
}

/// Character-boundary-safe truncation with a trailing ellipsis.
fn truncate(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(limit).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
