//! Event engine: extraction, filtering and formatting
//!
//! This module turns raw marketplace payloads into subscriber
//! notifications.
//!
//! # Overview
//!
//! For every payload the engine:
//! 1. Selects the event to inspect (first of `events`, else the payload)
//! 2. Extracts name, price, seller and token address
//! 3. Evaluates the configured filter
//! 4. Formats the notification text
//!
//! # Modules
//!
//! - [`extractor`]: Field extraction and structural diagnostics
//! - [`filter`]: Filter configuration and the delivery predicate
//! - [`formatter`]: Notification text rendering

pub mod extractor;
pub mod filter;
pub mod formatter;

pub use extractor::{extract, ExtractedFields, ShapeMatch};
pub use filter::{should_deliver, FilterConfig};
pub use formatter::NotificationFormatter;

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Domain suffixes reported by [`PayloadDiagnostics`]
pub const KNOWN_EXTENSIONS: &[&str] = &[".com", ".ai", ".io", ".org", ".net", ".xyz", ".eth"];

/// Diagnostic view of a payload, used by the control plane and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct PayloadDiagnostics {
    pub extracted_data: ExtractedFields,
    pub domain_name: Option<String>,
    pub domain_length: usize,
    pub domain_extensions: Vec<String>,
    pub token_address: Option<String>,
    pub price: Option<f64>,
    pub all_addresses_found: Vec<ShapeMatch>,
    pub all_hashes_found: Vec<ShapeMatch>,
}

impl PayloadDiagnostics {
    /// Runs extraction and both structural scans over `payload`.
    pub fn inspect(payload: &JsonValue) -> Self {
        let extracted = extract(payload);
        let lowered = extracted
            .name
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();

        Self {
            domain_name: extracted.name.clone(),
            domain_length: lowered.chars().count(),
            domain_extensions: KNOWN_EXTENSIONS
                .iter()
                .filter(|ext| lowered.ends_with(*ext))
                .map(|ext| ext.to_string())
                .collect(),
            token_address: extracted.token_address.clone(),
            price: extracted.price,
            all_addresses_found: extractor::find_all_addresses(payload),
            all_hashes_found: extractor::find_all_hashes(payload),
            extracted_data: extracted,
        }
    }
}
