//! # Webhook Dispatch
//!
//! Drives one delivery through the relay pipeline:
//!
//! ```text
//! Received -> Verified -> Parsed -> Formatted -> Delivered
//!     \
//!      `-> Rejected (signature missing or wrong)
//! ```
//!
//! The body is not looked at before the signature has been verified. A
//! delivery whose event renders to nothing ends after `Formatted` without a
//! sink call. Sink failures are reported in the [`DispatchOutcome`] rather than
//! as errors, since the sender is owed an acknowledgement either way.

use crate::events::{DataShapeError, EventKind, WebhookEvent};
use crate::formatter;
use crate::signature::SignatureVerifier;
use crate::sink::{MessageType, NotificationSink};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Lowercase name of the header carrying the event kind.
pub const EVENT_HEADER: &str = "x-github-event";

/// Lowercase name of the header carrying GitHub's delivery GUID.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

// ============================================================================
// Core Types
// ============================================================================

/// Raw delivery as received over HTTP.
#[derive(Debug, Clone)]
pub struct InboundWebhook {
    pub event_kind: Option<String>,
    pub signature: Option<String>,
    pub delivery_id: Option<String>,
    pub body: Bytes,
}

impl InboundWebhook {
    pub fn new(event_kind: Option<String>, signature: Option<String>, body: Bytes) -> Self {
        Self {
            event_kind,
            signature,
            delivery_id: None,
            body,
        }
    }

    /// Pick the relay's headers out of a lowercase-keyed header map.
    ///
    /// `signature_header` depends on the configured algorithm, see
    /// [`SignatureVerifier::header_name`].
    pub fn from_http_headers(
        headers: &HashMap<String, String>,
        signature_header: &str,
        body: Bytes,
    ) -> Self {
        Self {
            event_kind: headers.get(EVENT_HEADER).cloned(),
            signature: headers.get(signature_header).cloned(),
            delivery_id: headers.get(DELIVERY_HEADER).cloned(),
            body,
        }
    }
}

/// How a successfully handled delivery ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Exactly one message reached the sink.
    Delivered { kind: EventKind },

    /// The event rendered to nothing; the sink was not called.
    Suppressed { kind: EventKind },

    /// The sink was called once and failed.
    DeliveryFailed { kind: EventKind, reason: String },
}

impl DispatchOutcome {
    pub fn kind(&self) -> &EventKind {
        match self {
            Self::Delivered { kind } | Self::Suppressed { kind } => kind,
            Self::DeliveryFailed { kind, .. } => kind,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::Suppressed { .. } => "suppressed",
            Self::DeliveryFailed { .. } => "delivery_failed",
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Reasons a delivery is refused.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Webhook signature is missing or does not match")]
    Unauthenticated,

    #[error("Missing required header: {header}")]
    MissingHeader { header: &'static str },

    #[error("Request body is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    DataShape(#[from] DataShapeError),
}

impl DispatchError {
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }
}

// ============================================================================
// WebhookDispatcher
// ============================================================================

/// Verifies, formats and forwards webhook deliveries.
///
/// Holds no per-request state; share it across requests behind an `Arc`.
pub struct WebhookDispatcher {
    verifier: SignatureVerifier,
    sink: Arc<dyn NotificationSink>,
}

impl WebhookDispatcher {
    pub fn new(verifier: SignatureVerifier, sink: Arc<dyn NotificationSink>) -> Self {
        Self { verifier, sink }
    }

    /// Lowercase name of the signature header this dispatcher checks.
    pub fn signature_header(&self) -> &'static str {
        self.verifier.header_name()
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Run one delivery through the pipeline.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Unauthenticated`] before anything else is inspected
    /// - [`DispatchError::InvalidEncoding`] / [`DispatchError::InvalidJson`] for
    ///   an unreadable body
    /// - [`DispatchError::MissingHeader`] without an event kind
    /// - [`DispatchError::DataShape`] when the body lacks required fields
    #[instrument(
        skip(self, request),
        fields(
            event_kind = request.event_kind.as_deref().unwrap_or("<missing>"),
            delivery_id = request.delivery_id.as_deref().unwrap_or("<missing>"),
            body_len = request.body.len()
        )
    )]
    pub async fn dispatch(
        &self,
        request: &InboundWebhook,
    ) -> Result<DispatchOutcome, DispatchError> {
        // Verified
        let signature = request.signature.as_deref().unwrap_or_default();
        if !self.verifier.verify(&request.body, signature) {
            warn!(
                signature_present = !signature.is_empty(),
                algorithm = %self.verifier.algorithm(),
                "Rejecting webhook with invalid signature"
            );
            return Err(DispatchError::Unauthenticated);
        }

        // Parsed
        let text = std::str::from_utf8(&request.body)?;
        let payload: serde_json::Value = serde_json::from_str(text)?;

        // Formatted
        let kind = request
            .event_kind
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(EventKind::from_header)
            .ok_or(DispatchError::MissingHeader {
                header: EVENT_HEADER,
            })?;

        if !kind.is_known() {
            info!(event_kind = %kind, "No formatter for event kind, using fallback text");
        }

        let event = WebhookEvent::decode(&kind, payload)?;
        let Some(message) = formatter::render(&event) else {
            info!(event_kind = %kind, "Event rendered no message, skipping notification");
            return Ok(DispatchOutcome::Suppressed { kind });
        };

        // Delivered
        match self.sink.deliver(&message, MessageType::Markdown).await {
            Ok(()) => {
                info!(event_kind = %kind, "Notification delivered");
                Ok(DispatchOutcome::Delivered { kind })
            }
            Err(e) => {
                error!(
                    event_kind = %kind,
                    error = %e,
                    transient = e.is_transient(),
                    "Notification delivery failed"
                );
                Ok(DispatchOutcome::DeliveryFailed {
                    kind,
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl std::fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
