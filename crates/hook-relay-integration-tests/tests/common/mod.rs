//! Common test utilities for hook-relay integration tests
//!
//! This module provides:
//! - A router wired to a real `BotWebhookSink` pointed at a wiremock server
//! - Signing helpers and request builders
//! - Payload fixtures

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use hmac::{Hmac, Mac};
use hook_relay_api::{create_router, AppState, Environment, RelayConfig, SinkConfig, WebhookConfig};
use hook_relay_core::{
    BotWebhookSink, SignatureAlgorithm, SignatureVerifier, WebhookDispatcher, WebhookSecret,
};
use serde_json::{json, Value};
use sha1::Sha1;
use std::sync::Arc;
use wiremock::MockServer;

pub const SECRET: &str = "integration-test-secret";
pub const BOT_PATH: &str = "/cgi-bin/webhook/send";

/// Build the full application with its sink posting to `bot`.
pub fn create_test_app(bot: &MockServer, environment: Environment) -> Router {
    let config = RelayConfig {
        webhook: WebhookConfig {
            secret: WebhookSecret::new(SECRET).unwrap(),
            ..WebhookConfig::default()
        },
        sink: SinkConfig {
            url: format!("{}{}?key=integration", bot.uri(), BOT_PATH),
            timeout_seconds: 2,
            ..SinkConfig::default()
        },
        environment,
        ..RelayConfig::default()
    };
    config.validate().unwrap();

    let sink = BotWebhookSink::new(
        config.sink_url().unwrap(),
        config.sink.timeout(),
        &config.sink.user_agent,
    )
    .unwrap();
    let verifier = SignatureVerifier::new(config.webhook.secret.clone(), SignatureAlgorithm::Sha1);
    let dispatcher = WebhookDispatcher::new(verifier, Arc::new(sink));

    create_router(AppState::new(config, Arc::new(dispatcher)))
}

/// `sha1=<hex>` over `body` with the shared test secret.
pub fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

/// POST `payload` to the webhook endpoint as GitHub would, signed correctly.
pub fn signed_request(event: &str, payload: &Value) -> Request<Body> {
    let body = serde_json::to_vec(payload).unwrap();
    let signature = sign(&body);
    webhook_request(event, Some(&signature), body)
}

pub fn webhook_request(event: &str, signature: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("user-agent", "GitHub-Hookshot/044aadd")
        .header("x-github-event", event)
        .header("x-github-delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958");
    if let Some(signature) = signature {
        builder = builder.header("x-hub-signature", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn repository() -> Value {
    json!({
        "id": 1296269,
        "name": "relay",
        "full_name": "acme/relay",
        "url": "https://github.com/acme/relay"
    })
}

pub fn ping_payload() -> Value {
    json!({
        "zen": "Anything added dilutes everything else.",
        "hook_id": 30,
        "repository": repository(),
        "sender": { "login": "octocat", "id": 1 }
    })
}

/// The bot envelope the relay is expected to post for `content`.
pub fn markdown_envelope(content: &str) -> Value {
    json!({ "msgtype": "markdown", "markdown": { "content": content } })
}
