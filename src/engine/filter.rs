//! Listing filter evaluation
//!
//! This module decides whether an extracted event should be delivered to
//! subscribers, based on the filter configured through the control plane.

use crate::engine::extractor::ExtractedFields;
use serde::Serialize;
use std::fmt;

/// User-configurable delivery filter.
///
/// Replaced wholesale by the control plane; a disabled filter lets every
/// event through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterConfig {
    /// Lower price bound in ETH (inclusive)
    pub min_price: f64,
    /// Upper price bound in ETH (inclusive), `+inf` when unbounded
    pub max_price: f64,
    /// Maximum number of characters in the domain name
    pub max_letters: Option<usize>,
    /// Accepted name suffixes such as `.ai`; empty accepts all
    pub domain_extensions: Vec<String>,
    /// Substring the name must contain
    pub keyword: Option<String>,
    /// Substring the seller address must contain
    pub seller_address: Option<String>,
    /// Whether filtering is applied at all
    pub enabled: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_price: 0.0,
            max_price: f64::INFINITY,
            max_letters: None,
            domain_extensions: Vec::new(),
            keyword: None,
            seller_address: None,
            enabled: false,
        }
    }
}

impl FilterConfig {
    /// Returns true when either price bound restricts anything.
    pub fn price_bound_active(&self) -> bool {
        self.min_price > 0.0 || self.max_price < f64::INFINITY
    }

    /// Get filter summary for logging.
    ///
    /// # Examples
    ///
    /// ```
    /// use doma_relay::engine::filter::FilterConfig;
    ///
    /// let filter = FilterConfig {
    ///     domain_extensions: vec![".ai".to_string()],
    ///     keyword: Some("cool".to_string()),
    ///     enabled: true,
    ///     ..Default::default()
    /// };
    /// assert_eq!(filter.summary(), "extensions=.ai, keyword~cool");
    /// ```
    pub fn summary(&self) -> String {
        if !self.enabled {
            return "disabled (all events)".to_string();
        }

        let mut parts = Vec::new();

        if self.price_bound_active() {
            if self.max_price.is_finite() {
                parts.push(format!("price={}..={} ETH", self.min_price, self.max_price));
            } else {
                parts.push(format!("price>={} ETH", self.min_price));
            }
        }

        if let Some(max) = self.max_letters {
            parts.push(format!("max_letters={}", max));
        }

        if !self.domain_extensions.is_empty() {
            parts.push(format!("extensions={}", self.domain_extensions.join(",")));
        }

        if let Some(keyword) = &self.keyword {
            parts.push(format!("keyword~{}", keyword));
        }

        if let Some(seller) = &self.seller_address {
            parts.push(format!("seller~{}", seller));
        }

        if parts.is_empty() {
            "enabled, no criteria".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Why an event was filtered out.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// A price bound is active but the event carries no price
    MissingPrice,
    /// Price lies outside `[min, max]`
    PriceOutOfRange(f64),
    /// Name is longer than `max_letters`
    NameTooLong(usize),
    /// Name ends with none of the accepted extensions
    ExtensionNotAllowed,
    /// Name does not contain the keyword
    KeywordMissing,
    /// Seller address does not contain the configured fragment
    SellerMismatch,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingPrice => write!(f, "no price in event while a price range is active"),
            Rejection::PriceOutOfRange(price) => write!(f, "price {} outside configured range", price),
            Rejection::NameTooLong(len) => write!(f, "name has {} letters", len),
            Rejection::ExtensionNotAllowed => write!(f, "name has no allowed extension"),
            Rejection::KeywordMissing => write!(f, "name does not contain keyword"),
            Rejection::SellerMismatch => write!(f, "seller does not match"),
        }
    }
}

/// Evaluates the filter, returning the first failing criterion.
///
/// Only the price check rejects on a missing field; name and seller
/// checks are skipped when the event does not carry those fields.
pub fn rejection(extracted: &ExtractedFields, config: &FilterConfig) -> Option<Rejection> {
    if !config.enabled {
        return None;
    }

    if config.price_bound_active() {
        match extracted.price {
            None => return Some(Rejection::MissingPrice),
            Some(price) if !(config.min_price <= price && price <= config.max_price) => {
                return Some(Rejection::PriceOutOfRange(price));
            }
            Some(_) => {}
        }
    }

    if let Some(name) = extracted.name.as_deref().filter(|n| !n.is_empty()) {
        let domain = name.to_lowercase();

        if let Some(max) = config.max_letters {
            let letters = domain.chars().count();
            if letters > max {
                return Some(Rejection::NameTooLong(letters));
            }
        }

        if !config.domain_extensions.is_empty() {
            let clean = domain.trim();
            let allowed = config
                .domain_extensions
                .iter()
                .any(|ext| clean.ends_with(&ext.to_lowercase()));
            if !allowed {
                return Some(Rejection::ExtensionNotAllowed);
            }
        }

        if let Some(keyword) = &config.keyword {
            if !domain.contains(&keyword.to_lowercase()) {
                return Some(Rejection::KeywordMissing);
            }
        }
    }

    if let (Some(wanted), Some(seller)) = (
        &config.seller_address,
        extracted.seller_address.as_deref().filter(|s| !s.is_empty()),
    ) {
        if !seller.to_lowercase().contains(&wanted.to_lowercase()) {
            return Some(Rejection::SellerMismatch);
        }
    }

    None
}

/// Check if an event should be delivered based on filter criteria.
///
/// # Examples
///
/// ```
/// use doma_relay::engine::extractor::ExtractedFields;
/// use doma_relay::engine::filter::{should_deliver, FilterConfig};
///
/// let fields = ExtractedFields {
///     name: Some("cool.ai".to_string()),
///     ..Default::default()
/// };
/// let filter = FilterConfig {
///     domain_extensions: vec![".io".to_string()],
///     enabled: true,
///     ..Default::default()
/// };
/// assert!(!should_deliver(&fields, &filter));
/// ```
pub fn should_deliver(extracted: &ExtractedFields, config: &FilterConfig) -> bool {
    match rejection(extracted, config) {
        Some(reason) => {
            tracing::debug!(reason = %reason, name = ?extracted.name, "Event filtered out");
            false
        }
        None => true,
    }
}
