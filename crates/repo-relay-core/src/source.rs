//! # Repository Events Source
//!
//! Narrow contract for the repository-hosting activity feed consumed by the
//! polling path.

use crate::RepoUrl;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One raw record from a repository's activity feed, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFeedEvent {
    /// Platform-assigned opaque feed identifier, used only for cursor
    /// advancement.
    pub id: String,

    /// Platform event-type string (`PushEvent`, `IssuesEvent`, ...).
    pub kind: String,

    /// Login of the acting user, when the feed carries one.
    pub actor: Option<String>,

    /// `owner/repo` name as reported by the feed record.
    pub repo_name: Option<String>,

    /// Kind-specific payload, shaped like the feed API's `payload` field.
    pub payload: serde_json::Value,
}

/// Errors raised while fetching a repository's activity feed.
///
/// A fetch failure skips the repository for the current tick and leaves its
/// cursor unchanged; the repository is retried from the same position on
/// the next tick.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Repository not found or inaccessible: {repo}")]
    RepositoryUnavailable { repo: String },

    #[error("Upstream API error: {message}")]
    Upstream { message: String },

    #[error("Malformed feed response: {message}")]
    MalformedResponse { message: String },
}

/// Fetches recent activity-feed events for a repository.
#[async_trait]
pub trait RepoEventsSource: Send + Sync {
    /// Return the most recent feed events, newest first (platform order).
    ///
    /// The platform bounds this to a small recent window; the poller cuts
    /// the page at the stored cursor and reverses the unseen prefix to
    /// chronological order.
    async fn fetch_recent_events(&self, repo: &RepoUrl) -> Result<Vec<RawFeedEvent>, FetchError>;
}
