//! # Hook Relay HTTP Service
//!
//! HTTP surface for the hook relay.
//!
//! This service provides:
//! - The GitHub webhook endpoint (`POST /webhook` by default)
//! - A liveness endpoint (`GET /health`)
//! - An API description (`GET /docs`) in the `dev` environment only
//!
//! All webhook semantics live in [`hook_relay_core::WebhookDispatcher`]; this
//! crate converts HTTP requests into [`InboundWebhook`] values and dispatch
//! results back into responses.

pub mod config;
pub mod errors;
pub mod responses;

pub use config::{
    Environment, LoggingConfig, RelayConfig, ServerConfig, SinkConfig, WebhookConfig,
};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use responses::{DocsResponse, EndpointDoc, HealthResponse, WebhookAccepted};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Extension, Router,
};
use bytes::Bytes;
use hook_relay_core::{
    dispatcher::DELIVERY_HEADER, EventKind, InboundWebhook, WebhookDispatcher,
};
use std::{
    collections::HashMap,
    future::{Future, IntoFuture},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn};

/// Header carrying the request correlation ID, in both directions.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<RelayConfig>,

    /// Verifies, formats and forwards deliveries
    pub dispatcher: Arc<WebhookDispatcher>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: RelayConfig, dispatcher: Arc<WebhookDispatcher>) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route(&state.config.webhook.endpoint_path, post(handle_webhook))
        .route("/health", get(handle_health_check));

    if state.config.environment.exposes_docs() {
        router = router.route("/docs", get(handle_docs));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(DefaultBodyLimit::max(state.config.server.max_body_size))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
pub async fn start_server(
    config: RelayConfig,
    dispatcher: Arc<WebhookDispatcher>,
) -> Result<(), ServiceError> {
    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = bind_address.parse().map_err(|_| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("'{}' is not a valid bind address", bind_address),
        })
    })?;

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let state = AppState::new(config, dispatcher);
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", addr);

    // axum stops accepting connections on the signal and lets in-flight
    // requests finish, bounded by the shutdown timeout.
    let shutdown_started = Arc::new(Notify::new());
    let notifier = shutdown_started.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!(
            timeout_seconds = shutdown_timeout.as_secs(),
            "Draining in-flight requests"
        );
        notifier.notify_one();
    });

    drain_with_deadline(server.into_future(), shutdown_started, shutdown_timeout)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Drive `server` to completion, giving up `timeout` after `shutdown_started`
/// fires.
///
/// Requests still running at the deadline are dropped.
async fn drain_with_deadline<F, E>(
    server: F,
    shutdown_started: Arc<Notify>,
    timeout: Duration,
) -> Result<(), E>
where
    F: Future<Output = Result<(), E>>,
{
    let deadline = async {
        shutdown_started.notified().await;
        tokio::time::sleep(timeout).await;
    };

    tokio::select! {
        result = server => result,
        _ = deadline => {
            warn!(
                timeout_seconds = timeout.as_secs(),
                "Graceful shutdown timed out, abandoning in-flight requests"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle GitHub webhook requests
///
/// Returns `202 Accepted` with `{}` once the delivery has been verified and,
/// if it rendered a message, handed to the sink. A failed notification does
/// not change the response; it is logged by the dispatcher.
#[instrument(skip_all, fields(correlation_id = correlation_id.as_str()))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAccepted>), WebhookHandlerError> {
    // Convert headers to HashMap
    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_lowercase(),
                v.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();

    let request = InboundWebhook::from_http_headers(
        &header_map,
        state.dispatcher.signature_header(),
        body,
    );

    let outcome = state.dispatcher.dispatch(&request).await?;

    info!(
        event_kind = %outcome.kind(),
        outcome = outcome.as_str(),
        "Webhook accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(WebhookAccepted::default())))
}

// ============================================================================
// Health and Documentation Handlers
// ============================================================================

/// Basic health check endpoint
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// API description, mounted only in the `dev` environment
#[instrument(skip(state))]
async fn handle_docs(State(state): State<AppState>) -> Json<DocsResponse> {
    let config = &state.config;
    let verifier = state.dispatcher.verifier();

    Json(DocsResponse {
        service: "hook-relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: config.environment.as_str().to_string(),
        signature_header: verifier.header_name().to_string(),
        signature_algorithm: verifier.algorithm().to_string(),
        supported_events: EventKind::KNOWN.iter().map(|k| k.to_string()).collect(),
        endpoints: vec![
            EndpointDoc::new(
                "POST",
                &config.webhook.endpoint_path,
                "Receive a signed GitHub webhook and relay it to the chat bot",
            ),
            EndpointDoc::new("GET", "/health", "Liveness check"),
            EndpointDoc::new("GET", "/docs", "This document"),
        ],
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Identifier tying together every log line of one request.
///
/// Set by the request logging middleware and readable by handlers as an
/// `Extension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Take the caller's `x-correlation-id`, else GitHub's delivery GUID, else
    /// a fresh UUID.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let id = [CORRELATION_HEADER, DELIVERY_HEADER]
            .iter()
            .filter_map(|name| headers.get(*name))
            .filter_map(|value| value.to_str().ok())
            .find(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request logging middleware with correlation ID tracking
///
/// Echoes the correlation ID on the response and logs completion at a level
/// matching the status class.
#[instrument(skip_all, fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();
    let correlation_id = CorrelationId::from_headers(request.headers());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());
    debug!("Request started");

    let mut response = next.run(request).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    if let Ok(header_value) = HeaderValue::from_str(correlation_id.as_str()) {
        response
            .headers_mut()
            .insert(CORRELATION_HEADER, header_value);
    }

    let status = response.status();
    match status.as_u16() {
        500..=599 => error!(%status, duration_ms, "Request failed"),
        400..=499 => warn!(%status, duration_ms, "Request rejected"),
        _ => info!(%status, duration_ms, "Request completed"),
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
