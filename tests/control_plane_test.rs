//! Control-plane integration tests
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot`.
//! Upstream calls go to a `wiremock` server.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{listing_payload, new_relay, ready_relay, upstream_client};
use doma_relay::relay::Relay;
use doma_relay::server::{router, AppState};

fn app(relay: &Relay, upstream_url: &str) -> Router {
    router(
        AppState {
            relay: relay.clone(),
            upstream: upstream_client(upstream_url),
        },
        "http://localhost:5173",
    )
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_reports_state() {
    let (relay, _receiver) = ready_relay(&[1, 2]).await;

    let (status, body) = send(app(&relay, "http://127.0.0.1:9"), get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["bot_connected"], true);
    assert_eq!(body["users_count"], 2);
    assert_eq!(body["advanced_filter"]["enabled"], false);
    assert!(body["advanced_filter"]["max_price"].is_null());
}

#[tokio::test]
async fn test_health_before_bot_ready() {
    let (relay, _receiver) = new_relay();

    let (_, body) = send(app(&relay, "http://127.0.0.1:9"), get("/api/health")).await;

    assert_eq!(body["bot_connected"], false);
    assert_eq!(body["users_count"], 0);
}

#[tokio::test]
async fn test_configure_filter_then_health_shows_it() {
    let (relay, _receiver) = ready_relay(&[1]).await;

    let (status, body) = send(
        app(&relay, "http://127.0.0.1:9"),
        post_json(
            "/api/configure-filter",
            r#"{"minPrice": 1, "maxPrice": 2, "domainExtensions": [".eth"], "keyword": "alp"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Advanced filters configured successfully");

    let (_, health) = send(app(&relay, "http://127.0.0.1:9"), get("/api/health")).await;
    let filter = &health["advanced_filter"];
    assert_eq!(filter["enabled"], true);
    assert_eq!(filter["min_price"], 1.0);
    assert_eq!(filter["max_price"], 2.0);
    assert_eq!(filter["domain_extensions"], json!([".eth"]));
    assert_eq!(filter["keyword"], "alp");
}

#[tokio::test]
async fn test_configure_filter_accepts_negative_letter_limit() {
    let (relay, _receiver) = ready_relay(&[1]).await;

    let (status, _) = send(
        app(&relay, "http://127.0.0.1:9"),
        post_json("/api/configure-filter", r#"{"maxLetters": -1}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let filter = relay.filter().await;
    assert!(filter.enabled);
    assert!(filter.max_letters.is_none());
}

#[tokio::test]
async fn test_trigger_without_subscribers_is_400() {
    let (relay, mut receiver) = new_relay();
    relay.mark_ready();

    let (status, body) = send(
        app(&relay, "http://127.0.0.1:9"),
        post_json("/api/trigger-telegram", r#"{"message": "hi"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("No users to send message to"));
    assert!(receiver.try_next().is_none());
}

#[tokio::test]
async fn test_trigger_before_bot_ready_is_500() {
    let (relay, _receiver) = new_relay();
    relay.subscribers().add(doma_relay::delivery::ChatId(7)).await;

    let (status, body) = send(
        app(&relay, "http://127.0.0.1:9"),
        post_json("/api/trigger-telegram", r#"{"message": "hi"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Bot not initialized");
}

#[tokio::test]
async fn test_trigger_plain_message_is_queued_verbatim() {
    let (relay, mut receiver) = ready_relay(&[1, 2, 3]).await;

    let (status, body) = send(
        app(&relay, "http://127.0.0.1:9"),
        post_json("/api/trigger-telegram", r#"{"message": "*hello*"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Broadcast triggered for 3 users");
    assert_eq!(receiver.try_next().as_deref(), Some("*hello*"));
}

#[tokio::test]
async fn test_trigger_payload_is_formatted() {
    let (relay, mut receiver) = ready_relay(&[1]).await;
    let body = json!({ "message": "ignored", "responseData": listing_payload() }).to_string();

    let (status, _) = send(
        app(&relay, "http://127.0.0.1:9"),
        post_json("/api/trigger-telegram", &body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let text = receiver.try_next().unwrap();
    assert!(text.contains("📝 Name: alpha.eth"));
    assert!(text.contains("💰 Price: 1.500000 ETH"));
    assert!(text.contains("🆔 LastId: 41"));
}

#[tokio::test]
async fn test_trigger_payload_filtered_out() {
    let (relay, mut receiver) = ready_relay(&[1]).await;
    send(
        app(&relay, "http://127.0.0.1:9"),
        post_json("/api/configure-filter", r#"{"domainExtensions": [".ai"]}"#),
    )
    .await;

    let body = json!({ "responseData": listing_payload() }).to_string();
    let (status, response) = send(
        app(&relay, "http://127.0.0.1:9"),
        post_json("/api/trigger-telegram", &body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);
    assert_eq!(response["filtered"], true);
    assert!(receiver.try_next().is_none());
}

#[tokio::test]
async fn test_malformed_body_is_500() {
    let (relay, _receiver) = ready_relay(&[1]).await;

    let (status, body) = send(
        app(&relay, "http://127.0.0.1:9"),
        post_json("/api/configure-filter", "{not json"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_price_extraction_endpoint() {
    let (relay, _receiver) = ready_relay(&[1]).await;
    send(
        app(&relay, "http://127.0.0.1:9"),
        post_json("/api/configure-filter", r#"{"minPrice": 2}"#),
    )
    .await;

    let body = json!({ "responseData": listing_payload() }).to_string();
    let (status, response) = send(
        app(&relay, "http://127.0.0.1:9"),
        post_json("/api/test-price-extraction", &body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);
    assert_eq!(response["extracted_data"]["name"], "alpha.eth");
    assert_eq!(response["extracted_data"]["price"], 1.5);
    assert_eq!(response["advanced_filter"]["min_price"], 2.0);
    assert_eq!(response["should_send"], false);
}

#[tokio::test]
async fn test_api_response_endpoint_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let (relay, _receiver) = new_relay();
    let (status, body) = send(app(&relay, &server.uri()), get("/api/test-api-response")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["raw_response"]["lastId"], 41);
    assert_eq!(body["domain_name"], "alpha.eth");
    assert_eq!(body["domain_extensions"], json!([".eth"]));
    assert_eq!(body["price"], 1.5);
    assert!(body["all_addresses_found"].as_array().unwrap().len() >= 2);
}

#[tokio::test]
async fn test_api_response_endpoint_upstream_failure_is_502() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/poll"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let (relay, _receiver) = new_relay();
    let (status, body) = send(app(&relay, &server.uri()), get("/api/test-api-response")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("401"));
}

#[tokio::test]
async fn test_preflight_returns_204_with_cors_headers() {
    let (relay, _receiver) = new_relay();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/trigger-telegram")
        .body(Body::empty())
        .unwrap();

    let response = app(&relay, "http://127.0.0.1:9")
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert!(headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .contains("POST"));
}

#[tokio::test]
async fn test_regular_responses_carry_cors_origin() {
    let (relay, _receiver) = new_relay();

    let response = app(&relay, "http://127.0.0.1:9")
        .oneshot(get("/api/health"))
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (relay, _receiver) = new_relay();

    let response = app(&relay, "http://127.0.0.1:9")
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
