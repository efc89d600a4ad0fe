//! Notification message formatting
//!
//! Renders extracted fields plus a few raw payload fields into the fixed
//! multi-line text sent to subscribers.

use crate::engine::extractor::{display_value, select_event, ExtractedFields};
use serde_json::Value as JsonValue;
use std::fmt::{self, Write};

/// Default block explorer address prefix for token links
pub const DEFAULT_EXPLORER_BASE: &str = "https://explorer-testnet.doma.xyz/address/";

/// Event type shown when the payload does not name one
pub const DEFAULT_EVENT_TYPE: &str = "NAME_TOKEN_LISTED";

const HEADER: &str = "🌐 Doma API Data:";

/// Formats listing notifications
#[derive(Debug, Clone)]
pub struct NotificationFormatter {
    explorer_base: String,
}

impl Default for NotificationFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_EXPLORER_BASE)
    }
}

impl NotificationFormatter {
    /// Create a formatter linking token addresses under `explorer_base`
    pub fn new(explorer_base: impl Into<String>) -> Self {
        Self {
            explorer_base: explorer_base.into(),
        }
    }

    /// Formats a notification for the given fields and raw payload.
    ///
    /// Never fails: a rendering error is logged and replaced by
    /// [`fallback_message`].
    ///
    /// # Examples
    ///
    /// ```
    /// use doma_relay::engine::extractor::ExtractedFields;
    /// use doma_relay::engine::formatter::NotificationFormatter;
    /// use serde_json::json;
    ///
    /// let fields = ExtractedFields {
    ///     name: Some("alpha.eth".to_string()),
    ///     price: Some(1.0),
    ///     ..Default::default()
    /// };
    /// let text = NotificationFormatter::default().format(&fields, &json!({"lastId": 7}));
    /// assert!(text.contains("📝 Name: alpha.eth"));
    /// assert!(text.contains("💰 Price: 1.000000 ETH"));
    /// assert!(text.contains("🆔 LastId: 7"));
    /// ```
    pub fn format(&self, extracted: &ExtractedFields, raw: &JsonValue) -> String {
        match self.render(extracted, raw) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, name = ?extracted.name, "Failed to format notification");
                fallback_message(extracted)
            }
        }
    }

    fn render(&self, extracted: &ExtractedFields, raw: &JsonValue) -> Result<String, fmt::Error> {
        let event = select_event(raw);
        let event_type = event
            .get("type")
            .map(display_value)
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());
        let created = event
            .get("eventData")
            .and_then(|data| data.get("eventCreatedAt"))
            .map(display_value)
            .unwrap_or_else(|| "Unknown".to_string());
        let last_id = raw
            .get("lastId")
            .map(display_value)
            .unwrap_or_else(|| "Unknown".to_string());

        let mut out = String::new();
        writeln!(out, "{}", HEADER)?;
        writeln!(out)?;
        writeln!(out, "📝 Name: {}", extracted.name.as_deref().unwrap_or("Unknown"))?;
        writeln!(out, "🏷️ Type: {}", event_type)?;
        match extracted.price {
            Some(price) if price > 0.0 => writeln!(out, "💰 Price: {:.6} ETH", price)?,
            _ => writeln!(out, "💰 Price: Price not available")?,
        }
        writeln!(out, "📅 Created: {}", created)?;
        writeln!(out, "🆔 LastId: {}", last_id)?;
        match &extracted.token_address {
            Some(address) => write!(out, "🔗 Token Address: {}{}", self.explorer_base, address)?,
            None => write!(out, "🔗 Token Address: Not available")?,
        }

        Ok(out)
    }
}

/// Minimal message used when full formatting fails.
pub fn fallback_message(extracted: &ExtractedFields) -> String {
    format!(
        "{}\n\n{} - Data received but formatting failed",
        HEADER,
        extracted.name.as_deref().unwrap_or("Unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::extractor::extract;
    use serde_json::json;

    const TOKEN: &str = "0x1111111111111111111111111111111111111111";

    fn fixture() -> JsonValue {
        json!({
            "events": [{
                "type": "NAME_TOKEN_LISTED",
                "name": "alpha.eth",
                "tokenAddress": TOKEN,
                "eventData": {
                    "eventCreatedAt": "2024-05-01T12:00:00Z",
                    "payment": { "price": "1234567000000000000" }
                }
            }],
            "lastId": 42
        })
    }

    fn line_value<'a>(text: &'a str, label: &str) -> Option<&'a str> {
        text.lines()
            .find_map(|line| line.strip_prefix(label))
            .map(str::trim)
    }

    #[test]
    fn test_format_full_notification() {
        let raw = fixture();
        let text = NotificationFormatter::default().format(&extract(&raw), &raw);

        assert!(text.starts_with("🌐 Doma API Data:\n\n"));
        assert_eq!(line_value(&text, "🏷️ Type:"), Some("NAME_TOKEN_LISTED"));
        assert_eq!(line_value(&text, "📅 Created:"), Some("2024-05-01T12:00:00Z"));
        assert_eq!(line_value(&text, "🆔 LastId:"), Some("42"));
        assert_eq!(
            line_value(&text, "🔗 Token Address:"),
            Some(format!("{}{}", DEFAULT_EXPLORER_BASE, TOKEN).as_str())
        );
    }

    #[test]
    fn test_reparse_name_and_price() {
        let raw = fixture();
        let extracted = extract(&raw);
        let text = NotificationFormatter::default().format(&extracted, &raw);

        let name = line_value(&text, "📝 Name:").unwrap();
        assert_eq!(name, "alpha.eth");

        let price_text = line_value(&text, "💰 Price:")
            .and_then(|v| v.strip_suffix(" ETH"))
            .unwrap();
        let reparsed: f64 = price_text.parse().unwrap();
        let expected = format!("{:.6}", extracted.price.unwrap());
        assert_eq!(format!("{:.6}", reparsed), expected);
        assert_eq!(price_text, "1.234567");
    }

    #[test]
    fn test_format_degrades_on_missing_fields() {
        let text = NotificationFormatter::default().format(&ExtractedFields::default(), &json!({}));

        assert_eq!(line_value(&text, "📝 Name:"), Some("Unknown"));
        assert_eq!(line_value(&text, "🏷️ Type:"), Some(DEFAULT_EVENT_TYPE));
        assert_eq!(line_value(&text, "💰 Price:"), Some("Price not available"));
        assert_eq!(line_value(&text, "📅 Created:"), Some("Unknown"));
        assert_eq!(line_value(&text, "🆔 LastId:"), Some("Unknown"));
        assert_eq!(line_value(&text, "🔗 Token Address:"), Some("Not available"));
    }

    #[test]
    fn test_zero_price_not_available() {
        let fields = ExtractedFields {
            price: Some(0.0),
            ..Default::default()
        };
        let text = NotificationFormatter::default().format(&fields, &json!({}));
        assert_eq!(line_value(&text, "💰 Price:"), Some("Price not available"));
    }

    #[test]
    fn test_custom_explorer_base() {
        let fields = ExtractedFields {
            token_address: Some(TOKEN.to_string()),
            ..Default::default()
        };
        let text = NotificationFormatter::new("https://example.test/a/").format(&fields, &json!({}));
        assert!(text.ends_with(&format!("🔗 Token Address: https://example.test/a/{}", TOKEN)));
    }

    #[test]
    fn test_string_last_id_unquoted() {
        let text = NotificationFormatter::default()
            .format(&ExtractedFields::default(), &json!({"lastId": "abc"}));
        assert_eq!(line_value(&text, "🆔 LastId:"), Some("abc"));
    }

    #[test]
    fn test_fallback_message() {
        let fields = ExtractedFields {
            name: Some("alpha.eth".to_string()),
            ..Default::default()
        };
        assert_eq!(
            fallback_message(&fields),
            "🌐 Doma API Data:\n\nalpha.eth - Data received but formatting failed"
        );
        assert_eq!(
            fallback_message(&ExtractedFields::default()),
            "🌐 Doma API Data:\n\nUnknown - Data received but formatting failed"
        );
    }
}
