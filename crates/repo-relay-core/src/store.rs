//! # Subscription Store
//!
//! Persistent state behind the engine: chat → repository subscriptions with
//! their filters, the repository → chat reverse index used for routing,
//! per-repository ingestion cursors, and the retention-bounded message
//! identity cache that backs edit-in-place redelivery.
//!
//! The store is the only shared mutable resource in the system; every
//! operation is individually atomic, which is all the concurrency model
//! requires — the engine itself holds no locks.

use crate::filter::SubscriberFilter;
use crate::{ChatId, MessageHandle, RepoUrl};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// Default retention for message identities (24 hours).
pub const DEFAULT_IDENTITY_RETENTION_SECONDS: i64 = 86_400;

/// Errors raised by subscription store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend failure: {message}")]
    Backend { message: String },
}

impl StoreError {
    fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Persistent subscription, cursor, and message-identity state.
///
/// The subscription mutators exist for the human-facing command flows,
/// which read and write exclusively through this trait; the engine itself
/// only reads subscriptions and writes cursors and identities.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Subscribe a chat to a repository with the default filter.
    ///
    /// Re-subscribing an already subscribed chat resets its filter to the
    /// default.
    async fn add_subscription(&self, chat: ChatId, repo: &RepoUrl) -> Result<(), StoreError>;

    /// Remove a chat's subscription; returns whether one existed.
    async fn remove_subscription(&self, chat: ChatId, repo: &RepoUrl) -> Result<bool, StoreError>;

    /// Filter for a chat's subscription to a repository, if subscribed.
    async fn filter_for(
        &self,
        chat: ChatId,
        repo: &RepoUrl,
    ) -> Result<Option<SubscriberFilter>, StoreError>;

    /// Replace the filter on an existing subscription.
    async fn set_filter(
        &self,
        chat: ChatId,
        repo: &RepoUrl,
        filter: SubscriberFilter,
    ) -> Result<(), StoreError>;

    /// All chats subscribed to a repository (reverse index).
    async fn subscribed_chats(&self, repo: &RepoUrl) -> Result<Vec<ChatId>, StoreError>;

    /// The distinct set of repositories with at least one subscription.
    async fn subscribed_repositories(&self) -> Result<Vec<RepoUrl>, StoreError>;

    /// Last-seen source event ID for a repository, if one was recorded.
    async fn cursor(&self, repo: &RepoUrl) -> Result<Option<String>, StoreError>;

    /// Record the last-seen source event ID for a repository.
    async fn set_cursor(&self, repo: &RepoUrl, event_id: &str) -> Result<(), StoreError>;

    /// Handle of the message previously sent for `(chat, dedup_key)`, if
    /// still within the retention window.
    async fn message_identity(
        &self,
        chat: ChatId,
        dedup_key: &str,
    ) -> Result<Option<MessageHandle>, StoreError>;

    /// Record the message handle for `(chat, dedup_key)`, restarting its
    /// retention window.
    async fn record_message_identity(
        &self,
        chat: ChatId,
        dedup_key: &str,
        handle: MessageHandle,
    ) -> Result<(), StoreError>;
}

// ============================================================================
// In-memory implementation
// ============================================================================

#[derive(Debug, Clone)]
struct StoredIdentity {
    handle: MessageHandle,
    recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    /// chat → repo → filter
    subscriptions: HashMap<ChatId, HashMap<RepoUrl, SubscriberFilter>>,
    /// repo → chats (reverse index for routing)
    repo_chats: HashMap<RepoUrl, BTreeSet<ChatId>>,
    /// repo → last-seen feed event ID
    cursors: HashMap<RepoUrl, String>,
    /// (chat, dedup key) → identity
    identities: HashMap<(ChatId, String), StoredIdentity>,
}

/// Thread-safe in-memory [`SubscriptionStore`].
///
/// Suitable for single-instance deployments and tests; the layout mirrors
/// what a key-value backend would hold (subscription hash per chat, reverse
/// set per repository, cursor key per repository, identity hash per chat
/// with expiry).
pub struct InMemorySubscriptionStore {
    state: RwLock<StoreState>,
    identity_retention: Duration,
}

impl InMemorySubscriptionStore {
    /// Create a store with the default 24-hour identity retention.
    pub fn new() -> Self {
        Self::with_identity_retention(Duration::seconds(DEFAULT_IDENTITY_RETENTION_SECONDS))
    }

    /// Create a store with an explicit identity retention window.
    pub fn with_identity_retention(retention: Duration) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            identity_retention: retention,
        }
    }
}

impl Default for InMemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn add_subscription(&self, chat: ChatId, repo: &RepoUrl) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        state
            .subscriptions
            .entry(chat)
            .or_default()
            .insert(repo.clone(), SubscriberFilter::default_subscription());
        state.repo_chats.entry(repo.clone()).or_default().insert(chat);
        Ok(())
    }

    async fn remove_subscription(&self, chat: ChatId, repo: &RepoUrl) -> Result<bool, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        let removed = state
            .subscriptions
            .get_mut(&chat)
            .map(|repos| repos.remove(repo).is_some())
            .unwrap_or(false);

        if let Some(chats) = state.repo_chats.get_mut(repo) {
            chats.remove(&chat);
            if chats.is_empty() {
                state.repo_chats.remove(repo);
            }
        }

        Ok(removed)
    }

    async fn filter_for(
        &self,
        chat: ChatId,
        repo: &RepoUrl,
    ) -> Result<Option<SubscriberFilter>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        Ok(state
            .subscriptions
            .get(&chat)
            .and_then(|repos| repos.get(repo))
            .cloned())
    }

    async fn set_filter(
        &self,
        chat: ChatId,
        repo: &RepoUrl,
        filter: SubscriberFilter,
    ) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        if let Some(repos) = state.subscriptions.get_mut(&chat) {
            if let Some(existing) = repos.get_mut(repo) {
                *existing = filter;
            }
        }
        Ok(())
    }

    async fn subscribed_chats(&self, repo: &RepoUrl) -> Result<Vec<ChatId>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        Ok(state
            .repo_chats
            .get(repo)
            .map(|chats| chats.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn subscribed_repositories(&self) -> Result<Vec<RepoUrl>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        let mut repos: Vec<RepoUrl> = state.repo_chats.keys().cloned().collect();
        repos.sort();
        Ok(repos)
    }

    async fn cursor(&self, repo: &RepoUrl) -> Result<Option<String>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        Ok(state.cursors.get(repo).cloned())
    }

    async fn set_cursor(&self, repo: &RepoUrl, event_id: &str) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        state.cursors.insert(repo.clone(), event_id.to_string());
        Ok(())
    }

    async fn message_identity(
        &self,
        chat: ChatId,
        dedup_key: &str,
    ) -> Result<Option<MessageHandle>, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        let key = (chat, dedup_key.to_string());
        match state.identities.get(&key) {
            Some(identity) if Utc::now() - identity.recorded_at <= self.identity_retention => {
                Ok(Some(identity.handle))
            }
            Some(_) => {
                // Expired: drop lazily and report absent
                state.identities.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn record_message_identity(
        &self,
        chat: ChatId,
        dedup_key: &str,
        handle: MessageHandle,
    ) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::backend("store lock poisoned"))?;

        state.identities.insert(
            (chat, dedup_key.to_string()),
            StoredIdentity {
                handle,
                recorded_at: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
