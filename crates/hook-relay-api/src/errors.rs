//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hook_relay_core::DispatchError;
use tracing::warn;

/// Webhook handler errors with HTTP status code mapping
///
/// - `403 Forbidden`: the signature is missing or does not match. The body
///   says only that the request is forbidden.
/// - `400 Bad Request`: the body is not UTF-8 JSON, the event header is
///   missing, or the payload lacks fields its event kind requires.
///
/// Every error is rendered as a JSON body with `error`, `status` and
/// `timestamp` fields; nothing escapes as a bare 5xx.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Dispatch pipeline refused the delivery
    #[error("{0}")]
    Rejected(#[from] DispatchError),
}

impl WebhookHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Rejected(e) if e.is_authentication_failure() => StatusCode::FORBIDDEN,
            Self::Rejected(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match status {
            StatusCode::FORBIDDEN => {
                warn!("Webhook rejected: signature verification failed");
                "Forbidden".to_string()
            }
            _ => {
                warn!(error = %self, "Webhook rejected: malformed request");
                self.to_string()
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),
}
