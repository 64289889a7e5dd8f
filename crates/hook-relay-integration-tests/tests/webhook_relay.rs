//! End-to-end tests: signed GitHub deliveries in, bot messages out.
//!
//! Each test runs the full router with a real `BotWebhookSink` posting to a
//! wiremock server standing in for the group-chat bot.

mod common;

use axum::http::{Request, StatusCode};
use common::{
    create_test_app, markdown_envelope, ping_payload, repository, signed_request,
    webhook_request, BOT_PATH,
};
use hook_relay_api::Environment;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bot_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0, "errmsg": "ok" }))
}

/// Verify that a signed ping is acknowledged and relayed exactly once
#[tokio::test]
async fn test_signed_ping_relayed_once() {
    // Arrange
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(BOT_PATH))
        .and(header("content-type", "application/json"))
        .and(body_json(markdown_envelope(
            "[relay](https://github.com/acme/relay) pinged by octocat",
        )))
        .respond_with(bot_ok())
        .expect(1)
        .mount(&bot)
        .await;
    let app = create_test_app(&bot, Environment::Production);

    // Act
    let response = app
        .oneshot(signed_request("ping", &ping_payload()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"{}");
}

/// Verify that a forged signature is refused and nothing reaches the bot
#[tokio::test]
async fn test_invalid_signature_refused_without_notification() {
    // Arrange
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(bot_ok())
        .expect(0)
        .mount(&bot)
        .await;
    let app = create_test_app(&bot, Environment::Production);
    let body = serde_json::to_vec(&ping_payload()).unwrap();
    let forged = format!("sha1={}", "0".repeat(40));

    // Act
    let response = app
        .oneshot(webhook_request("ping", Some(&forged), body))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Verify that a multi-commit push produces one message listing every commit
#[tokio::test]
async fn test_push_relayed_with_all_commits() {
    // Arrange
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(markdown_envelope(
            "[relay:main](https://github.com/acme/relay) 2 commits by Monalisa Octocat:\n\
             > [Fix all the bugs](https://github.com/acme/relay/commit/1)\n\
             > [Update README](https://github.com/acme/relay/commit/2)",
        )))
        .respond_with(bot_ok())
        .expect(1)
        .mount(&bot)
        .await;
    let app = create_test_app(&bot, Environment::Production);
    let payload = json!({
        "ref": "refs/heads/main",
        "before": "0000000000000000000000000000000000000000",
        "repository": repository(),
        "commits": [
            {
                "id": "1",
                "message": "Fix all the bugs",
                "url": "https://github.com/acme/relay/commit/1",
                "author": { "name": "Monalisa Octocat", "email": "mona@example.com" }
            },
            {
                "id": "2",
                "message": "Update README",
                "url": "https://github.com/acme/relay/commit/2",
                "author": { "name": "Hubot", "email": "hubot@example.com" }
            }
        ]
    });

    // Act
    let response = app.oneshot(signed_request("push", &payload)).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

/// Verify that a workflow run without a status is acknowledged but not relayed
#[tokio::test]
async fn test_workflow_run_without_status_not_relayed() {
    // Arrange
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(bot_ok())
        .expect(0)
        .mount(&bot)
        .await;
    let app = create_test_app(&bot, Environment::Production);
    let payload = json!({
        "action": "requested",
        "repository": repository(),
        "workflow_run": {
            "name": "CI",
            "html_url": "https://github.com/acme/relay/actions/runs/1",
            "status": null,
            "conclusion": null
        }
    });

    // Act
    let response = app
        .oneshot(signed_request("workflow_run", &payload))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

/// Verify that an unrecognized event kind is relayed with the fallback text
#[tokio::test]
async fn test_unrecognized_event_relayed_as_fallback() {
    // Arrange
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(markdown_envelope("Unhandled event: watch")))
        .respond_with(bot_ok())
        .expect(1)
        .mount(&bot)
        .await;
    let app = create_test_app(&bot, Environment::Production);

    // Act
    let response = app
        .oneshot(signed_request("watch", &json!({ "action": "started" })))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

/// Verify that a failing bot does not change the acknowledgement owed to GitHub
#[tokio::test]
async fn test_bot_failure_still_acknowledged() {
    // Arrange
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&bot)
        .await;
    let app = create_test_app(&bot, Environment::Production);

    // Act
    let response = app
        .oneshot(signed_request("ping", &ping_payload()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

/// Verify that a bot-level rejection (errcode) is also only logged
#[tokio::test]
async fn test_bot_errcode_still_acknowledged() {
    // Arrange
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "errcode": 45009, "errmsg": "api freq out of limit" })),
        )
        .expect(1)
        .mount(&bot)
        .await;
    let app = create_test_app(&bot, Environment::Production);

    // Act
    let response = app
        .oneshot(signed_request("ping", &ping_payload()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

/// Verify that a signed payload missing required fields is a structured 400
#[tokio::test]
async fn test_payload_missing_fields_is_structured_400() {
    // Arrange
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(bot_ok())
        .expect(0)
        .mount(&bot)
        .await;
    let app = create_test_app(&bot, Environment::Production);
    let payload = json!({ "repository": repository(), "deployment": {} });

    // Act
    let response = app
        .oneshot(signed_request("deployment", &payload))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], 400);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("environment"));
}

/// Verify that a body larger than the configured limit is refused
#[tokio::test]
async fn test_oversized_body_refused() {
    // Arrange
    let bot = MockServer::start().await;
    let app = create_test_app(&bot, Environment::Production);
    let body = vec![b' '; 6 * 1024 * 1024];
    let signature = common::sign(&body);

    // Act
    let response = app
        .oneshot(webhook_request("ping", Some(&signature), body))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

/// Verify that the API description is only reachable in dev
#[tokio::test]
async fn test_docs_exposure_follows_environment() {
    let bot = MockServer::start().await;

    for (environment, expected) in [
        (Environment::Dev, StatusCode::OK),
        (Environment::Production, StatusCode::NOT_FOUND),
    ] {
        let app = create_test_app(&bot, environment);
        let response = app
            .oneshot(
                Request::get("/docs")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), expected, "environment {:?}", environment);
    }
}
