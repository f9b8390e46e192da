//! # Notification Sink
//!
//! Narrow contract for the chat-platform client. The engine never talks to
//! the platform directly; it hands rendered text to a sink and receives a
//! message handle back.

use crate::{ChatId, MessageHandle};
use async_trait::async_trait;

/// Errors raised by a notification sink.
///
/// A sink failure for one chat is never fatal: the dispatch engine logs it,
/// skips the chat, and continues with the remaining subscribers.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Chat platform rejected the message: {message}")]
    Rejected { message: String },

    #[error("Chat platform unreachable: {message}")]
    Unreachable { message: String },
}

/// Delivers rendered notifications to a chat destination.
///
/// When `edit_if_exists` is true and a message identity for `dedup_key` is
/// still within its retention window, the implementation edits that message
/// in place instead of sending a new one. A failed edit (e.g. the message
/// was deleted) falls back to sending a new message and re-recording its
/// identity; the fallback is not an error.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Send or edit a notification, returning the handle of the message
    /// that now carries the content.
    async fn deliver(
        &self,
        chat: ChatId,
        text: &str,
        dedup_key: Option<&str>,
        edit_if_exists: bool,
    ) -> Result<MessageHandle, DeliveryError>;
}
