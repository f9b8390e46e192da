//! # Dispatch Engine
//!
//! The single convergence point for both ingestion paths. Every normalized
//! event, whether it arrived on the webhook path or the polling path, goes
//! through this engine for subscriber resolution, filter evaluation,
//! rendering, and delivery.
//!
//! Delivery is per-chat isolated: a sink failure for one chat is logged and
//! counted, never propagated, so a broken subscriber cannot block the rest.

use crate::filter::should_deliver;
use crate::format::{EventFormatter, RenderStyle, RenderedEvent};
use crate::sink::NotificationSink;
use crate::store::{StoreError, SubscriptionStore};
use crate::{ChatId, NormalizedEvent, RepoUrl};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Divider between events inside one grouped message.
const GROUP_DIVIDER_WIDTH: usize = 30;

/// Outcome counters for one dispatch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Messages handed to the sink successfully.
    pub delivered: usize,

    /// Chat/event pairs rejected by a subscriber filter.
    pub filtered: usize,

    /// Deliveries the sink failed; logged and skipped.
    pub failed: usize,
}

/// Routes normalized events to subscribed chats.
///
/// Holds only trait objects; the concrete store, sink, and formatter are
/// injected at startup, which keeps the engine fully testable with fakes.
pub struct DispatchEngine {
    store: Arc<dyn SubscriptionStore>,
    sink: Arc<dyn NotificationSink>,
    formatter: Arc<dyn EventFormatter>,
}

impl DispatchEngine {
    /// Create an engine over the given store, sink, and formatter.
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        sink: Arc<dyn NotificationSink>,
        formatter: Arc<dyn EventFormatter>,
    ) -> Self {
        Self {
            store,
            sink,
            formatter,
        }
    }

    /// Dispatch one event immediately to every subscriber of its repository.
    ///
    /// This is the webhook path: no grouping, no cursor involvement. Events
    /// the formatter declines (no renderer for the kind, or a sub-action
    /// that produces no message) dispatch to nobody and report an all-zero
    /// summary.
    #[instrument(skip(self, event), fields(repo = %event.repository_url, kind = ?event.kind))]
    pub async fn handle_immediate(
        &self,
        event: &NormalizedEvent,
    ) -> Result<DispatchSummary, StoreError> {
        let mut summary = DispatchSummary::default();

        let Some(rendered) = self.formatter.render(event, RenderStyle::Standalone) else {
            debug!("Event kind produced no rendering, nothing to deliver");
            return Ok(summary);
        };

        let chats = self.store.subscribed_chats(&event.repository_url).await?;
        for chat in chats {
            let Some(filter) = self.store.filter_for(chat, &event.repository_url).await? else {
                continue;
            };

            if !should_deliver(event, &filter) {
                summary.filtered += 1;
                continue;
            }

            self.deliver_one(chat, event, &rendered, &mut summary).await;
        }

        Ok(summary)
    }

    /// Dispatch one polling tick's worth of events for a repository.
    ///
    /// `events` must be in chronological order. Subscribers with grouping
    /// enabled receive one combined message per tick; everyone else receives
    /// the same individual messages the webhook path would have produced.
    #[instrument(skip(self, events), fields(repo = %repository, count = events.len()))]
    pub async fn handle_batch(
        &self,
        repository: &RepoUrl,
        events: &[NormalizedEvent],
    ) -> Result<DispatchSummary, StoreError> {
        let mut summary = DispatchSummary::default();
        if events.is_empty() {
            return Ok(summary);
        }

        let chats = self.store.subscribed_chats(repository).await?;
        for chat in chats {
            let Some(filter) = self.store.filter_for(chat, repository).await? else {
                continue;
            };

            let surviving: Vec<&NormalizedEvent> = events
                .iter()
                .filter(|event| {
                    let keep = should_deliver(event, &filter);
                    if !keep {
                        summary.filtered += 1;
                    }
                    keep
                })
                .collect();

            if surviving.is_empty() {
                continue;
            }

            if filter.grouping_enabled {
                self.deliver_grouped(chat, repository, &surviving, &mut summary)
                    .await;
            } else {
                for event in surviving {
                    let Some(rendered) = self.formatter.render(event, RenderStyle::Standalone)
                    else {
                        continue;
                    };
                    self.deliver_one(chat, event, &rendered, &mut summary).await;
                }
            }
        }

        Ok(summary)
    }

    async fn deliver_one(
        &self,
        chat: ChatId,
        event: &NormalizedEvent,
        rendered: &RenderedEvent,
        summary: &mut DispatchSummary,
    ) {
        let result = self
            .sink
            .deliver(
                chat,
                &rendered.text,
                Some(&rendered.dedup_key),
                event.kind.edits_in_place(),
            )
            .await;

        match result {
            Ok(_) => summary.delivered += 1,
            Err(error) => {
                warn!(chat = %chat, %error, "Delivery failed, skipping chat");
                summary.failed += 1;
            }
        }
    }

    async fn deliver_grouped(
        &self,
        chat: ChatId,
        repository: &RepoUrl,
        events: &[&NormalizedEvent],
        summary: &mut DispatchSummary,
    ) {
        let bodies: Vec<String> = events
            .iter()
            .filter_map(|event| self.formatter.render(event, RenderStyle::Grouped))
            .map(|rendered| rendered.text)
            .collect();

        if bodies.is_empty() {
            return;
        }

        let text = compose_group(repository, &bodies);

        // Grouped messages aggregate many entities, so they carry no dedup
        // key and are never edited in place.
        match self.sink.deliver(chat, &text, None, false).await {
            Ok(_) => summary.delivered += 1,
            Err(error) => {
                warn!(chat = %chat, %error, "Grouped delivery failed, skipping chat");
                summary.failed += 1;
            }
        }
    }
}

/// Combine rendered event bodies into one grouped message with a repository
/// headline and a divider between events.
fn compose_group(repository: &RepoUrl, bodies: &[String]) -> String {
    let divider = format!("\n{}\n", "\u{2500}".repeat(GROUP_DIVIDER_WIDTH));
    let noun = if bodies.len() == 1 { "update" } else { "updates" };
    format!(
        "\u{1F4E6} <b>{}</b>: {} {}\n\n{}",
        repository.display_name(),
        bodies.len(),
        noun,
        bodies.join(&divider)
    )
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
