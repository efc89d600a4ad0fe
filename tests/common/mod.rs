use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;

use doma_relay::delivery::{ChatId, DeliveryQueue, DeliveryReceiver, SubscriberSet};
use doma_relay::engine::NotificationFormatter;
use doma_relay::relay::Relay;
use doma_relay::upstream::{DomaClient, DomaClientConfig};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// A single-event listing page for `alpha.eth` at 1.5 ETH.
#[allow(dead_code)]
pub fn listing_payload() -> JsonValue {
    json!({
        "events": [{
            "id": 41,
            "name": "alpha.eth",
            "type": "NAME_TOKEN_LISTED",
            "eventData": {
                "tokenAddress": "0x1234567890abcdef1234567890abcdef12345678",
                "seller": "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd",
                "payment": {"price": "1500000000000000000"}
            },
            "createdAt": "2025-01-01T00:00:00Z"
        }],
        "lastId": 41,
        "hasMoreEvents": false
    })
}

/// A relay with no subscribers and the bot not yet ready.
#[allow(dead_code)]
pub fn new_relay() -> (Relay, DeliveryReceiver) {
    let (queue, receiver) = DeliveryQueue::new();
    let relay = Relay::new(queue, SubscriberSet::new(), NotificationFormatter::default());
    (relay, receiver)
}

/// A ready relay with the given subscribers.
#[allow(dead_code)]
pub async fn ready_relay(chats: &[i64]) -> (Relay, DeliveryReceiver) {
    let (relay, receiver) = new_relay();
    for chat in chats {
        relay.subscribers().add(ChatId(*chat)).await;
    }
    relay.mark_ready();
    (relay, receiver)
}

/// Upstream client pointed at a mock server.
#[allow(dead_code)]
pub fn upstream_client(base_url: &str) -> DomaClient {
    DomaClient::new(DomaClientConfig {
        base_url: base_url.to_string(),
        api_key: "test-key".to_string(),
        poll_timeout: Duration::from_secs(2),
        diagnostic_timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .expect("failed to build upstream client")
}
