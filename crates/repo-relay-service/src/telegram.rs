//! # Telegram Notification Sink
//!
//! Bot API client implementing the notification sink contract. Messages are
//! sent as HTML with link previews disabled. When asked to edit in place,
//! the sink looks up the previous message identity for the dedup key and
//! tries `editMessageText` first; any edit failure (message deleted, too
//! old, identity expired upstream) falls back to a fresh `sendMessage`.

use async_trait::async_trait;
use repo_relay_core::{ChatId, DeliveryError, MessageHandle, NotificationSink, SubscriptionStore};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Telegram Bot API sink.
pub struct TelegramSink {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    store: Arc<dyn SubscriptionStore>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message_id: i64,
}

impl TelegramSink {
    /// Create a sink for the given Bot API base and token.
    ///
    /// The store is consulted for message identities; identity bookkeeping
    /// failures degrade to plain sends, never failed deliveries.
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        store: Arc<dyn SubscriptionStore>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            store,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, DeliveryError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Unreachable {
                message: e.to_string(),
            })?;

        response
            .json::<ApiResponse>()
            .await
            .map_err(|e| DeliveryError::Unreachable {
                message: format!("malformed Bot API response: {e}"),
            })
    }

    async fn try_edit(
        &self,
        chat: ChatId,
        handle: MessageHandle,
        text: &str,
    ) -> Result<(), DeliveryError> {
        let response = self
            .call(
                "editMessageText",
                serde_json::json!({
                    "chat_id": chat.as_i64(),
                    "message_id": handle.as_i64(),
                    "text": text,
                    "parse_mode": "HTML",
                    "disable_web_page_preview": true,
                }),
            )
            .await?;

        if response.ok {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                message: response
                    .description
                    .unwrap_or_else(|| "edit rejected".to_string()),
            })
        }
    }

    async fn send_new(&self, chat: ChatId, text: &str) -> Result<MessageHandle, DeliveryError> {
        let response = self
            .call(
                "sendMessage",
                serde_json::json!({
                    "chat_id": chat.as_i64(),
                    "text": text,
                    "parse_mode": "HTML",
                    "disable_web_page_preview": true,
                }),
            )
            .await?;

        if !response.ok {
            return Err(DeliveryError::Rejected {
                message: response
                    .description
                    .unwrap_or_else(|| "send rejected".to_string()),
            });
        }

        response
            .result
            .map(|message| MessageHandle::new(message.message_id))
            .ok_or_else(|| DeliveryError::Rejected {
                message: "Bot API response carried no message".to_string(),
            })
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    #[instrument(skip(self, text), fields(chat = %chat))]
    async fn deliver(
        &self,
        chat: ChatId,
        text: &str,
        dedup_key: Option<&str>,
        edit_if_exists: bool,
    ) -> Result<MessageHandle, DeliveryError> {
        if edit_if_exists {
            if let Some(dedup_key) = dedup_key {
                let existing = match self.store.message_identity(chat, dedup_key).await {
                    Ok(existing) => existing,
                    Err(error) => {
                        warn!(%error, "Identity lookup failed, sending fresh message");
                        None
                    }
                };

                if let Some(handle) = existing {
                    match self.try_edit(chat, handle, text).await {
                        Ok(()) => {
                            debug!(handle = %handle, "Edited existing message");
                            return Ok(handle);
                        }
                        Err(error) => {
                            debug!(%error, "Edit failed, falling back to a new message");
                        }
                    }
                }
            }
        }

        let handle = self.send_new(chat, text).await?;

        if let Some(dedup_key) = dedup_key {
            if let Err(error) = self.store.record_message_identity(chat, dedup_key, handle).await {
                warn!(%error, "Failed to record message identity");
            }
        }

        Ok(handle)
    }
}

#[cfg(test)]
#[path = "telegram_tests.rs"]
mod tests;
