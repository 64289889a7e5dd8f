//! # Hook Relay Core
//!
//! Core business logic for the hook relay: authenticating GitHub webhooks,
//! turning their payloads into chat-ready markdown, and handing the result to
//! a notification sink.
//!
//! ## Architecture
//!
//! The pipeline is strictly linear per request:
//!
//! 1. [`signature::SignatureVerifier`] checks the HMAC signature header against
//!    the raw body.
//! 2. [`events::WebhookEvent`] decodes the body into a typed payload selected by
//!    the event-type header.
//! 3. [`formatter::render`] produces an optional [`formatter::FormattedMessage`].
//! 4. [`sink::NotificationSink`] delivers the message.
//!
//! [`dispatcher::WebhookDispatcher`] drives these steps. Nothing in this crate
//! holds cross-request state; the dispatcher can be shared behind an `Arc`.
//!
//! ## Usage
//!
//! ```rust
//! use hook_relay_core::formatter::format_event;
//! use serde_json::json;
//!
//! let payload = json!({
//!     "repository": { "name": "relay", "url": "https://github.com/acme/relay" },
//!     "sender": { "login": "octocat" }
//! });
//!
//! let message = format_event("ping", payload).unwrap().unwrap();
//! assert_eq!(message.as_str(), "[relay](https://github.com/acme/relay) pinged by octocat");
//! ```

pub mod dispatcher;
pub mod events;
pub mod formatter;
pub mod signature;
pub mod sink;

pub use dispatcher::{DispatchError, DispatchOutcome, InboundWebhook, WebhookDispatcher};
pub use events::{DataShapeError, EventKind, WebhookEvent};
pub use formatter::{format_event, FormattedMessage};
pub use signature::{SignatureAlgorithm, SignatureVerifier, WebhookSecret};
pub use sink::{BotWebhookSink, MessageType, NotificationSink, SinkError};

// ============================================================================
// Error Types
// ============================================================================

/// Validation errors for values supplied by configuration or callers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },
}
