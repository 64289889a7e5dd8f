//! Tests for the group-chat bot sink.

use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOT_PATH: &str = "/cgi-bin/webhook/send";

fn sink_for(server: &MockServer) -> BotWebhookSink {
    let endpoint = Url::parse(&format!("{}{}?key=test-key", server.uri(), BOT_PATH)).unwrap();
    BotWebhookSink::new(endpoint, Duration::from_secs(5), "hook-relay-tests").unwrap()
}

mod deliver_tests {
    use super::*;

    #[tokio::test]
    async fn test_markdown_envelope_posted_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(BOT_PATH))
            .and(query_param("key", "test-key"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "msgtype": "markdown",
                "markdown": { "content": "[r](u) pinged by a" }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0, "errmsg": "ok" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = sink_for(&server)
            .deliver(
                &FormattedMessage::new("[r](u) pinged by a"),
                MessageType::Markdown,
            )
            .await;

        assert!(result.is_ok(), "delivery should succeed: {:?}", result);
    }

    #[tokio::test]
    async fn test_text_envelope_uses_text_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(BOT_PATH))
            .and(body_json(json!({
                "msgtype": "text",
                "text": { "content": "plain" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0 })))
            .expect(1)
            .mount(&server)
            .await;

        let result = sink_for(&server)
            .deliver(&FormattedMessage::new("plain"), MessageType::Text)
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = sink_for(&server)
            .deliver(&FormattedMessage::new("m"), MessageType::Markdown)
            .await
            .unwrap_err();

        assert!(matches!(err, SinkError::HttpStatus { status: 502 }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_nonzero_errcode_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errcode": 93000,
                "errmsg": "invalid webhook url"
            })))
            .mount(&server)
            .await;

        let err = sink_for(&server)
            .deliver(&FormattedMessage::new("m"), MessageType::Markdown)
            .await
            .unwrap_err();

        match err {
            SinkError::Rejected { code, ref message } => {
                assert_eq!(code, 93000);
                assert_eq!(message, "invalid webhook url");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_non_json_success_body_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let result = sink_for(&server)
            .deliver(&FormattedMessage::new("m"), MessageType::Markdown)
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let server = MockServer::start().await;
        let sink = sink_for(&server);
        drop(server);

        let err = sink
            .deliver(&FormattedMessage::new("m"), MessageType::Markdown)
            .await
            .unwrap_err();

        assert!(matches!(err, SinkError::Transport(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_transport_error_does_not_reveal_bot_key() {
        let server = MockServer::start().await;
        let sink = sink_for(&server);
        drop(server);

        let err = sink
            .deliver(&FormattedMessage::new("m"), MessageType::Markdown)
            .await
            .unwrap_err();

        let shown = err.to_string();
        assert!(!shown.contains("test-key"), "got: {}", shown);
        assert!(!format!("{:?}", err).contains("test-key"));
    }

    #[tokio::test]
    async fn test_timeout_error_does_not_reveal_bot_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        let endpoint = Url::parse(&format!("{}{}?key=test-key", server.uri(), BOT_PATH)).unwrap();
        let sink = BotWebhookSink::new(endpoint, Duration::from_millis(100), "ua").unwrap();

        let err = sink
            .deliver(&FormattedMessage::new("m"), MessageType::Markdown)
            .await
            .unwrap_err();

        assert!(err.is_transient(), "timeouts are transient: {:?}", err);
        assert!(!err.to_string().contains("test-key"), "got: {}", err);
    }
}

mod debug_formatting_tests {
    use super::*;

    #[test]
    fn test_debug_redacts_bot_key() {
        let endpoint =
            Url::parse("https://qyapi.example.com/cgi-bin/webhook/send?key=very-secret").unwrap();
        let sink = BotWebhookSink::new(endpoint, Duration::from_secs(1), "ua").unwrap();

        let debug_str = format!("{:?}", sink);

        assert!(!debug_str.contains("very-secret"), "got: {}", debug_str);
        assert!(debug_str.contains("qyapi.example.com"));
    }
}
