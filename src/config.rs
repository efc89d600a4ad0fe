//! Configuration management for doma-relay
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::engine::formatter::DEFAULT_EXPLORER_BASE;
use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for doma-relay
///
/// Every section is optional in the YAML file and falls back to its
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Telegram Bot API settings
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Marketplace API settings
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Control-plane listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Companion website settings
    #[serde(default)]
    pub website: WebsiteConfig,
    /// Notification rendering settings
    #[serde(default)]
    pub notification: NotificationConfig,
    /// In-process poller settings
    #[serde(default)]
    pub poller: PollerConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    #[serde(default)]
    pub bot_token: String,

    /// Bot API root URL
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Seconds a `getUpdates` long poll may wait
    #[serde(default = "default_long_poll_timeout")]
    pub long_poll_timeout_secs: u64,

    /// Timeout for other Bot API requests
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_long_poll_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_telegram_api_base(),
            long_poll_timeout_secs: default_long_poll_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Marketplace API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// API base URL
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    /// Value sent in the `Api-Key` header
    #[serde(default)]
    pub api_key: String,

    /// Event types requested from the poll endpoint
    #[serde(default = "default_event_types")]
    pub event_types: Vec<String>,

    /// Events per page
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Budget for routine polls, in milliseconds
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// Budget for diagnostic fetches, in seconds
    #[serde(default = "default_diagnostic_timeout")]
    pub diagnostic_timeout_secs: u64,
}

fn default_upstream_url() -> String {
    "https://api-testnet.doma.xyz".to_string()
}

fn default_event_types() -> Vec<String> {
    vec!["NAME_TOKEN_LISTED".to_string()]
}

fn default_limit() -> u32 {
    1
}

fn default_poll_timeout_ms() -> u64 {
    900
}

fn default_diagnostic_timeout() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            api_key: String::new(),
            event_types: default_event_types(),
            limit: default_limit(),
            poll_timeout_ms: default_poll_timeout_ms(),
            diagnostic_timeout_secs: default_diagnostic_timeout(),
        }
    }
}

/// Control-plane listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Value of `Access-Control-Allow-Origin`
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_allowed_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

/// Companion website configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteConfig {
    #[serde(default = "default_website_url")]
    pub url: String,

    #[serde(default = "default_website_timeout")]
    pub timeout_secs: u64,

    /// Characters of page text shown before truncating
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_website_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_website_timeout() -> u64 {
    10
}

fn default_max_chars() -> usize {
    3000
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            url: default_website_url(),
            timeout_secs: default_website_timeout(),
            max_chars: default_max_chars(),
        }
    }
}

/// Notification rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Prefix for token address links
    #[serde(default = "default_explorer_base")]
    pub explorer_base: String,
}

fn default_explorer_base() -> String {
    DEFAULT_EXPLORER_BASE.to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            explorer_base: default_explorer_base(),
        }
    }
}

/// In-process poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    15
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_poll_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Log file path (if None, stderr only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("Failed to read config file: {}", e)))?;
        Ok(serde_yaml::from_str(&contents).map_err(RelayError::from)?)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }

        if let Ok(api_base) = std::env::var("DOMA_RELAY_TELEGRAM_API_BASE") {
            self.telegram.api_base = api_base;
        }

        if let Ok(api_key) = std::env::var("DOMA_API_KEY") {
            self.upstream.api_key = api_key;
        }

        if let Ok(url) = std::env::var("DOMA_RELAY_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }

        if let Ok(event_types) = std::env::var("DOMA_RELAY_EVENT_TYPES") {
            let types_vec: Vec<String> = event_types
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if types_vec.is_empty() {
                tracing::warn!("Invalid DOMA_RELAY_EVENT_TYPES: {}", event_types);
            } else {
                tracing::debug!(?types_vec, "Env override: DOMA_RELAY_EVENT_TYPES");
                self.upstream.event_types = types_vec;
            }
        }

        if let Ok(host) = std::env::var("DOMA_RELAY_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("DOMA_RELAY_PORT") {
            if let Ok(value) = port.parse() {
                self.server.port = value;
            } else {
                tracing::warn!("Invalid DOMA_RELAY_PORT: {}", port);
            }
        }

        if let Ok(url) = std::env::var("DOMA_RELAY_WEBSITE_URL") {
            self.website.url = url;
        }

        if let Ok(enabled) = std::env::var("DOMA_RELAY_POLLER_ENABLED") {
            match parse_bool(&enabled) {
                Some(value) => self.poller.enabled = value,
                None => tracing::warn!("Invalid DOMA_RELAY_POLLER_ENABLED: {}", enabled),
            }
        }

        if let Ok(interval) = std::env::var("DOMA_RELAY_POLLER_INTERVAL") {
            if let Ok(value) = interval.parse() {
                self.poller.interval_secs = value;
            } else {
                tracing::warn!("Invalid DOMA_RELAY_POLLER_INTERVAL: {}", interval);
            }
        }

        if let Ok(level) = std::env::var("DOMA_RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("DOMA_RELAY_JSON_LOGS") {
            match parse_bool(&json_logs) {
                Some(value) => self.logging.json_format = value,
                None => tracing::warn!("Invalid DOMA_RELAY_JSON_LOGS: {}", json_logs),
            }
        }

        if let Ok(file) = std::env::var("DOMA_RELAY_LOG_FILE") {
            self.logging.file_path = Some(PathBuf::from(file));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// Checks value ranges only; credentials are checked separately by
    /// [`Config::require_credentials`] since offline commands do not need
    /// them.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(RelayError::Config("server.port must be greater than 0".to_string()).into());
        }

        validate_url("upstream.base_url", &self.upstream.base_url)?;
        validate_url("telegram.api_base", &self.telegram.api_base)?;
        validate_url("website.url", &self.website.url)?;

        if self.upstream.limit == 0 {
            return Err(
                RelayError::Config("upstream.limit must be greater than 0".to_string()).into(),
            );
        }

        for (field, value) in [
            ("upstream.poll_timeout_ms", self.upstream.poll_timeout_ms),
            (
                "upstream.diagnostic_timeout_secs",
                self.upstream.diagnostic_timeout_secs,
            ),
            (
                "telegram.request_timeout_secs",
                self.telegram.request_timeout_secs,
            ),
            ("website.timeout_secs", self.website.timeout_secs),
        ] {
            if value == 0 {
                return Err(
                    RelayError::Config(format!("{} must be greater than 0", field)).into(),
                );
            }
        }

        if self.poller.enabled && self.poller.interval_secs == 0 {
            return Err(RelayError::Config(
                "poller.interval_secs must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Ensure the bot token needed to run the relay is present
    ///
    /// # Errors
    ///
    /// Returns `RelayError::MissingCredentials` when the token is empty
    pub fn require_credentials(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(RelayError::MissingCredentials(
                "telegram.bot_token is not set (use TELEGRAM_BOT_TOKEN)".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    match Url::parse(value.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(RelayError::Config(format!(
            "{} must use http or https, got {}",
            field,
            url.scheme()
        ))
        .into()),
        Err(e) => Err(RelayError::Config(format!("{} is not a valid URL: {}", field, e)).into()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
