//! Error types for doma-relay
//!
//! This module defines the crate-level error type, using `thiserror` for
//! ergonomic error handling. Subsystems that talk to external services
//! (upstream API, Telegram, website) define their own error enums next to
//! their clients and convert into [`RelayError`] at the command boundary.

use thiserror::Error;

/// Main error type for doma-relay operations
///
/// Covers configuration loading, server startup, and the conversions from
/// the I/O and serialization layers used by the command handlers.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required startup credentials are missing
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Control-plane server errors (bind, serve)
    #[error("Server error: {0}")]
    Server(String),

    /// Upstream marketplace API errors
    #[error("Upstream error: {0}")]
    Upstream(#[from] crate::upstream::UpstreamError),

    /// Telegram Bot API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] crate::telegram::TelegramError),

    /// Website fetch errors
    #[error("Website error: {0}")]
    Website(#[from] crate::website::WebsiteError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for doma-relay operations
///
/// Uses `anyhow::Error` so command handlers can attach context while
/// still propagating [`RelayError`] values with `?`.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = RelayError::Config("port must be greater than 0".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: port must be greater than 0"
        );
    }

    #[test]
    fn test_missing_credentials_display() {
        let err = RelayError::MissingCredentials("TELEGRAM_BOT_TOKEN".to_string());
        assert_eq!(err.to_string(), "Missing credentials: TELEGRAM_BOT_TOKEN");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err: RelayError = io.into();
        assert!(matches!(err, RelayError::Io(_)));
        assert!(err.to_string().contains("in use"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: RelayError = json_err.into();
        assert!(matches!(err, RelayError::Serialization(_)));
    }

    #[test]
    fn test_error_into_anyhow() {
        let result: Result<()> = Err(RelayError::Server("bind failed".to_string()).into());
        let err = result.unwrap_err();
        assert!(err.downcast_ref::<RelayError>().is_some());
    }
}
