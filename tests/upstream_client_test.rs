//! Marketplace API client integration tests against a `wiremock` server.

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{listing_payload, upstream_client};
use doma_relay::upstream::{has_events, last_id, DomaClient, DomaClientConfig, UpstreamError};

#[tokio::test]
async fn test_poll_sends_query_and_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/poll"))
        .and(query_param("eventTypes", "NAME_TOKEN_LISTED"))
        .and(query_param("limit", "1"))
        .and(header("Api-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let payload = upstream_client(&server.uri()).poll().await.unwrap();

    assert!(has_events(&payload));
    assert_eq!(last_id(&payload).as_deref(), Some("41"));
}

#[tokio::test]
async fn test_poll_joins_multiple_event_types() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/poll"))
        .and(query_param("eventTypes", "NAME_TOKEN_LISTED,NAME_TOKENIZED"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = DomaClient::new(DomaClientConfig {
        base_url: server.uri(),
        event_types: vec!["NAME_TOKEN_LISTED".to_string(), "NAME_TOKENIZED".to_string()],
        limit: 5,
        ..Default::default()
    })
    .unwrap();

    let payload = client.poll_diagnostic().await.unwrap();
    assert!(!has_events(&payload));
}

#[tokio::test]
async fn test_non_json_body_is_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let payload = upstream_client(&server.uri()).poll().await.unwrap();

    assert_eq!(payload, json!({ "raw_response": "maintenance" }));
    assert!(last_id(&payload).is_none());
}

#[tokio::test]
async fn test_non_200_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/poll"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = upstream_client(&server.uri()).poll().await.unwrap_err();

    match err {
        UpstreamError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "unavailable");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_poll_timeout_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/poll"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing_payload())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = DomaClient::new(DomaClientConfig {
        base_url: server.uri(),
        poll_timeout: Duration::from_millis(50),
        ..Default::default()
    })
    .unwrap();

    let err = client.poll().await.unwrap_err();
    assert!(matches!(err, UpstreamError::Http(ref e) if e.is_timeout()));
}

#[tokio::test]
async fn test_ack_posts_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/poll/ack/41"))
        .and(header("Api-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    upstream_client(&server.uri()).ack("41").await.unwrap();
}

#[tokio::test]
async fn test_ack_failure_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/poll/ack/9"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown cursor"))
        .mount(&server)
        .await;

    let err = upstream_client(&server.uri()).ack("9").await.unwrap_err();
    assert_eq!(err.to_string(), "API returned status 404: unknown cursor");
}
