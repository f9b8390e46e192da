//! # Polling Ingestion Loop
//!
//! Periodically fetches the activity feed of every subscribed repository,
//! cuts each page at the stored cursor, and hands the unseen events to the
//! dispatch engine in chronological order.
//!
//! Cursor discipline: the cursor always advances to the newest RAW feed
//! event ID, whether or not any event on the page was deliverable. A page of
//! entirely unsupported kinds still moves the cursor, so the same events are
//! never reconsidered. On a fetch failure the cursor stays put and the
//! repository is retried from the same position next tick.

use crate::dispatch::DispatchEngine;
use crate::normalizer::normalize_feed;
use crate::source::RepoEventsSource;
use crate::store::{StoreError, SubscriptionStore};
use crate::{NormalizedEvent, RepoUrl};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Poller timing configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between polling ticks.
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// Periodic activity-feed poller.
///
/// Owns no subscription state; every tick re-reads the set of subscribed
/// repositories from the store, so subscriptions added or removed between
/// ticks take effect without coordination.
pub struct Poller {
    config: PollerConfig,
    store: Arc<dyn SubscriptionStore>,
    engine: Arc<DispatchEngine>,
    source: Arc<dyn RepoEventsSource>,
}

impl Poller {
    /// Create a poller over the given store, engine, and feed source.
    pub fn new(
        config: PollerConfig,
        store: Arc<dyn SubscriptionStore>,
        engine: Arc<DispatchEngine>,
        source: Arc<dyn RepoEventsSource>,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            source,
        }
    }

    /// Run the polling loop until the shutdown signal flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.config.interval.as_secs(), "Polling loop started");

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first interval tick completes immediately; skip it so startup
        // does not race subscription loading.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = self.tick().await {
                        error!(%error, "Polling tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Polling loop stopping");
                        return;
                    }
                }
            }
        }
    }

    /// Poll every subscribed repository once.
    ///
    /// Store failures abort the tick; feed failures are isolated per
    /// repository.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<(), StoreError> {
        let repositories = self.store.subscribed_repositories().await?;
        debug!(count = repositories.len(), "Polling subscribed repositories");

        for repository in repositories {
            self.poll_repository(&repository).await?;
        }

        Ok(())
    }

    #[instrument(skip(self), fields(repo = %repository))]
    async fn poll_repository(&self, repository: &RepoUrl) -> Result<(), StoreError> {
        let page = match self.source.fetch_recent_events(repository).await {
            Ok(page) => page,
            Err(error) => {
                warn!(%error, "Feed fetch failed, will retry from the same cursor");
                return Ok(());
            }
        };

        if page.is_empty() {
            return Ok(());
        }

        // The page is newest first; the newest ID becomes the next cursor
        // regardless of how many events below turn out deliverable.
        let newest_id = page[0].id.clone();

        let cursor = self.store.cursor(repository).await?;
        let unseen: Vec<_> = match &cursor {
            Some(cursor) => page.iter().take_while(|event| &event.id != cursor).collect(),
            None => page.iter().collect(),
        };

        if unseen.is_empty() {
            return Ok(());
        }

        // Reverse the unseen prefix into chronological order before
        // normalizing; unsupported kinds drop out here.
        let events: Vec<NormalizedEvent> = unseen
            .into_iter()
            .rev()
            .filter_map(|raw| normalize_feed(raw, repository))
            .collect();

        if !events.is_empty() {
            let summary = self.engine.handle_batch(repository, &events).await?;
            debug!(
                delivered = summary.delivered,
                filtered = summary.filtered,
                failed = summary.failed,
                "Batch dispatched"
            );
        }

        self.store.set_cursor(repository, &newest_id).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
