//! # Subscriber Filtering
//!
//! Per-subscriber filter data and the delivery predicate. Evaluation is a
//! pure function of `(event.category, event.author, filter)` — no other
//! state is consulted — so both ingestion paths behave identically and the
//! predicate is trivially testable.

use crate::{FilterCategory, NormalizedEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-subscription filter settings, owned by the subscription store and
/// read-only from the engine's perspective.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberFilter {
    /// Authors whose events are never delivered. Empty means no exclusions.
    #[serde(default)]
    pub excluded_authors: BTreeSet<String>,

    /// Allow-list of event categories. Empty means all categories are
    /// allowed (open policy), NOT "nothing allowed" — the asymmetry with
    /// `excluded_authors` is deliberate and must be preserved.
    #[serde(default)]
    pub allowed_categories: BTreeSet<FilterCategory>,

    /// Combine one polling tick's surviving events into a single message.
    #[serde(default)]
    pub grouping_enabled: bool,
}

impl SubscriberFilter {
    /// Filter applied to a freshly created subscription.
    ///
    /// New subscriptions start with the explicit allow-list of all four
    /// known categories rather than the empty (unrestricted) set; only a
    /// later explicit "select none" produces the open policy.
    pub fn default_subscription() -> Self {
        Self {
            excluded_authors: BTreeSet::new(),
            allowed_categories: BTreeSet::from([
                FilterCategory::Push,
                FilterCategory::Issues,
                FilterCategory::PullRequest,
                FilterCategory::WorkflowRun,
            ]),
            grouping_enabled: false,
        }
    }
}

/// Decide whether an event is delivered to a subscriber.
///
/// Ordered short-circuit:
/// 1. A non-empty allow-list that does not contain the event's category
///    rejects.
/// 2. A present author listed in `excluded_authors` rejects.
/// 3. Otherwise accept.
pub fn should_deliver(event: &NormalizedEvent, filter: &SubscriberFilter) -> bool {
    if !filter.allowed_categories.is_empty() && !filter.allowed_categories.contains(&event.category)
    {
        return false;
    }

    if let Some(author) = &event.author {
        if filter.excluded_authors.contains(author) {
            return false;
        }
    }

    true
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
