//! Delivery of formatted messages to a group-chat bot.
//!
//! [`NotificationSink`] is the seam between the dispatcher and the outside
//! world. [`BotWebhookSink`] is the production implementation: it posts the
//! message to a WeCom-style "group robot" webhook as
//!
//! ```json
//! { "msgtype": "markdown", "markdown": { "content": "<message>" } }
//! ```
//!
//! The bot answers HTTP 200 even for rejected messages and reports the real
//! outcome in an `errcode` field, so both are checked.

use crate::formatter::FormattedMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

// ============================================================================
// Core Types
// ============================================================================

/// Rendering mode requested from the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Markdown,
    Text,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for formatted messages.
///
/// Implementations own any retry or queueing policy; callers make exactly one
/// `deliver` call per message.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(
        &self,
        message: &FormattedMessage,
        message_type: MessageType,
    ) -> Result<(), SinkError>;
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to create HTTP client: {message}")]
    Configuration { message: String },

    /// The URL is stripped from the wrapped error; it carries the bot key.
    #[error("Request to notification endpoint failed: {0}")]
    Transport(reqwest::Error),

    #[error("Notification endpoint returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Notification endpoint rejected the message (errcode {code}): {message}")]
    Rejected { code: i64, message: String },
}

impl SinkError {
    fn transport(error: reqwest::Error) -> Self {
        Self::Transport(error.without_url())
    }

    /// Check if the failure might succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Configuration { .. } => false,
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus { status } => *status == 429 || *status >= 500,
            Self::Rejected { .. } => false,
        }
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct BotContent<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct BotMessage<'a> {
    msgtype: MessageType,

    #[serde(skip_serializing_if = "Option::is_none")]
    markdown: Option<BotContent<'a>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<BotContent<'a>>,
}

impl<'a> BotMessage<'a> {
    fn new(message_type: MessageType, content: &'a str) -> Self {
        let body = Some(BotContent { content });
        match message_type {
            MessageType::Markdown => Self {
                msgtype: message_type,
                markdown: body,
                text: None,
            },
            MessageType::Text => Self {
                msgtype: message_type,
                markdown: None,
                text: body,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct BotReply {
    #[serde(default)]
    errcode: i64,

    #[serde(default)]
    errmsg: String,
}

// ============================================================================
// BotWebhookSink
// ============================================================================

/// Posts messages to a group-chat bot webhook URL.
#[derive(Clone)]
pub struct BotWebhookSink {
    endpoint: Url,
    http_client: reqwest::Client,
}

impl BotWebhookSink {
    /// Build a sink for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Configuration` if the HTTP client cannot be created.
    pub fn new(endpoint: Url, timeout: Duration, user_agent: &str) -> Result<Self, SinkError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| SinkError::Configuration {
                message: e.to_string(),
            })?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl NotificationSink for BotWebhookSink {
    #[instrument(skip(self, message), fields(message_len = message.as_str().len()))]
    async fn deliver(
        &self,
        message: &FormattedMessage,
        message_type: MessageType,
    ) -> Result<(), SinkError> {
        let envelope = BotMessage::new(message_type, message.as_str());

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(SinkError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::HttpStatus {
                status: status.as_u16(),
            });
        }

        // Bots that answer with something other than the errcode envelope are
        // taken at their HTTP status.
        let body = response.text().await.map_err(SinkError::transport)?;
        if let Ok(reply) = serde_json::from_str::<BotReply>(&body) {
            if reply.errcode != 0 {
                return Err(SinkError::Rejected {
                    code: reply.errcode,
                    message: reply.errmsg,
                });
            }
        }

        debug!(status = status.as_u16(), "Notification delivered");
        Ok(())
    }
}

// The webhook URL embeds the bot key as a query parameter.
impl fmt::Debug for BotWebhookSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotWebhookSink")
            .field("host", &self.endpoint.host_str().unwrap_or("<none>"))
            .field("path", &self.endpoint.path())
            .field("query", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
