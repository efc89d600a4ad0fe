//! doma-relay - Doma marketplace listings relayed to Telegram
//!
//! This library polls the Doma marketplace API, extracts structured fields
//! from loosely shaped listing events, filters them against user criteria,
//! and broadcasts matching events to Telegram subscribers. A small HTTP
//! control plane lets a companion website configure the filter and push
//! messages.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `engine`: Field extraction, filter predicate, message formatting
//! - `delivery`: Outbound queue, subscriber set, broadcaster
//! - `relay`: Shared state injected into every task
//! - `server`: HTTP control plane
//! - `telegram`: Bot API client and update loop
//! - `upstream`: Marketplace API client
//! - `website`: Companion website fetch
//! - `poller`: Optional in-process upstream poller
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```
//! use doma_relay::engine::{extract, should_deliver, FilterConfig};
//! use serde_json::json;
//!
//! let payload = json!({"events": [{"name": "cool.ai"}]});
//! let filter = FilterConfig {
//!     keyword: Some("coo".to_string()),
//!     enabled: true,
//!     ..Default::default()
//! };
//! assert!(should_deliver(&extract(&payload), &filter));
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod logging;
pub mod poller;
pub mod relay;
pub mod server;
pub mod telegram;
pub mod upstream;
pub mod website;

// Re-export commonly used types
pub use config::Config;
pub use error::{RelayError, Result};
pub use relay::{Relay, SubmitError, SubmitOutcome};
