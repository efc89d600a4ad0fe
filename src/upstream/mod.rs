//! Doma marketplace API integration
//!
//! - [`client`]: HTTP client for the poll and ack endpoints

pub mod client;

pub use client::{has_events, last_id, DomaClient, DomaClientConfig, UpstreamError};
