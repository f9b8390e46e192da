//! # Repo-Relay Core
//!
//! Core business logic for the repo-relay notification service.
//!
//! This crate contains the domain logic for ingesting repository events from
//! two independent paths (webhook push and activity-feed polling), filtering
//! them per subscriber, and dispatching notifications to chat destinations.
//!
//! ## Architecture
//!
//! Both ingestion paths converge on [`dispatch::DispatchEngine`], the only
//! place where filtering, grouping, and dedup-key bookkeeping happen. The
//! engine depends only on trait abstractions ([`store::SubscriptionStore`],
//! [`sink::NotificationSink`], [`format::EventFormatter`]); infrastructure
//! implementations are injected at runtime.
//!
//! ## Usage
//!
//! ```rust
//! use repo_relay_core::{ChatId, EventKind, FilterCategory, RepoUrl};
//!
//! let repo = RepoUrl::new("https://github.com/owner/repo/");
//! assert_eq!(repo.as_str(), "https://github.com/owner/repo");
//! assert_eq!(EventKind::WorkflowRun.filter_category(), FilterCategory::WorkflowRun);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Opaque identifier of a chat destination subscribed to notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(i64);

impl ChatId {
    /// Create new chat ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get numeric value
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical repository URL used as the routing key everywhere a repository
/// is identified: subscription storage, the webhook path, and the poller.
///
/// Construction strips the trailing slash so that
/// `https://github.com/owner/repo/` and `https://github.com/owner/repo`
/// compare equal. The same normalization must be applied wherever the key is
/// derived, which is why the only way to obtain a `RepoUrl` is through
/// [`RepoUrl::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoUrl(String);

impl RepoUrl {
    /// Create a canonical repository URL, stripping any trailing slashes.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self(url.trim_end_matches('/').to_string())
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short display name for message headlines (`owner/repo` for GitHub
    /// URLs, the full URL otherwise).
    pub fn display_name(&self) -> &str {
        self.0
            .strip_prefix("https://github.com/")
            .or_else(|| self.0.strip_prefix("http://github.com/"))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform-assigned handle of a previously sent message, used to edit the
/// message in place on redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(i64);

impl MessageHandle {
    /// Create new message handle
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get numeric value
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Event Classification
// ============================================================================

/// Fine-grained event kind used for rendering, as a closed enumeration.
///
/// Loosely-typed platform event strings from both ingestion paths are mapped
/// into this enum by [`normalizer`]; anything without a renderer maps to no
/// event at all (dropped), so `Other` appears only for events that are
/// renderable but carry no dedicated kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Push,
    IssueOpened,
    IssueClosed,
    IssueReopened,
    IssueEdited,
    IssueComment,
    PullRequestOpened,
    PullRequestClosed,
    PullRequestMerged,
    PullRequestReopened,
    PullRequestEdited,
    PullRequestReviewRequested,
    PullRequestSynchronized,
    PullRequestReviewComment,
    WorkflowRun,
    BranchOrTagCreated,
    Other,
}

impl EventKind {
    /// Coarse classification used for subscriber filtering.
    ///
    /// Pure and total: every kind maps to exactly one category, checked by
    /// the exhaustive match.
    pub fn filter_category(&self) -> FilterCategory {
        match self {
            Self::Push | Self::BranchOrTagCreated => FilterCategory::Push,
            Self::IssueOpened
            | Self::IssueClosed
            | Self::IssueReopened
            | Self::IssueEdited
            | Self::IssueComment => FilterCategory::Issues,
            Self::PullRequestOpened
            | Self::PullRequestClosed
            | Self::PullRequestMerged
            | Self::PullRequestReopened
            | Self::PullRequestEdited
            | Self::PullRequestReviewRequested
            | Self::PullRequestSynchronized
            | Self::PullRequestReviewComment => FilterCategory::PullRequest,
            Self::WorkflowRun => FilterCategory::WorkflowRun,
            Self::Other => FilterCategory::Other,
        }
    }

    /// Whether repeated notifications for the same entity edit the previous
    /// message instead of sending a new one.
    ///
    /// True for workflow runs and pull-request lifecycle events: both
    /// represent long-lived entities whose status changes in place. Review
    /// comments are discrete and always produce fresh messages.
    pub fn edits_in_place(&self) -> bool {
        matches!(
            self,
            Self::WorkflowRun
                | Self::PullRequestOpened
                | Self::PullRequestClosed
                | Self::PullRequestMerged
                | Self::PullRequestReopened
                | Self::PullRequestEdited
                | Self::PullRequestReviewRequested
                | Self::PullRequestSynchronized
        )
    }

    /// Whether the event is push-like for author resolution purposes.
    pub(crate) fn is_push_like(&self) -> bool {
        matches!(self, Self::Push | Self::BranchOrTagCreated)
    }
}

/// Coarse event classification subscribers filter on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterCategory {
    Push,
    Issues,
    PullRequest,
    WorkflowRun,
    Other,
}

impl FilterCategory {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Issues => "issues",
            Self::PullRequest => "pull_request",
            Self::WorkflowRun => "workflow_run",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Normalized Event
// ============================================================================

/// Canonical event shape, independent of which ingestion path observed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Canonical repository identifier, stable across both paths.
    pub repository_url: RepoUrl,

    /// Fine-grained kind used for rendering and edit-in-place decisions.
    pub kind: EventKind,

    /// Coarse category used for subscriber filtering; always
    /// `kind.filter_category()`.
    pub category: FilterCategory,

    /// Best-effort author login; absent is valid.
    pub author: Option<String>,

    /// Platform-assigned activity-feed identifier. Present only on the
    /// polling path, where it drives cursor advancement; the webhook path
    /// never consults cursors.
    pub source_event_id: Option<String>,

    /// Kind-specific payload fields consumed by the formatter.
    pub payload: serde_json::Value,
}

impl NormalizedEvent {
    /// Create a normalized event, deriving the filter category from the kind.
    pub fn new(
        repository_url: RepoUrl,
        kind: EventKind,
        author: Option<String>,
        source_event_id: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            repository_url,
            category: kind.filter_category(),
            kind,
            author,
            source_event_id,
            payload,
        }
    }
}

// ============================================================================
// Module declarations
// ============================================================================

/// Dual-path event normalization into [`NormalizedEvent`]
pub mod normalizer;

/// Subscriber filters and the pure delivery predicate
pub mod filter;

/// Event formatter capability and the default GitHub renderer
pub mod format;

/// Dispatch engine: filtering, grouping, and delivery orchestration
pub mod dispatch;

/// Subscription store trait and the in-memory adapter
pub mod store;

/// Notification sink trait
pub mod sink;

/// Repository events source trait for the polling path
pub mod source;

/// Polling ingestion loop
pub mod poller;

// Re-export key types for convenience
pub use dispatch::{DispatchEngine, DispatchSummary};
pub use filter::{should_deliver, SubscriberFilter};
pub use format::{EventFormatter, GithubEventFormatter, RenderStyle, RenderedEvent};
pub use normalizer::{normalize_feed, normalize_webhook};
pub use poller::{Poller, PollerConfig};
pub use sink::{DeliveryError, NotificationSink};
pub use source::{FetchError, RawFeedEvent, RepoEventsSource};
pub use store::{InMemorySubscriptionStore, StoreError, SubscriptionStore};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
