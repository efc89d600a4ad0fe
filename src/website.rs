//! Companion website fetch
//!
//! Fetches the configured website and reduces its HTML to plain text lines
//! for display in a chat message.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::WebsiteConfig;

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>")
        .expect("script/style pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

const TRUNCATION_MARKER: &str = "\n\n... (truncated)";

/// Errors from fetching the website.
#[derive(Error, Debug)]
pub enum WebsiteError {
    /// Nothing is listening at the configured address
    #[error("Could not connect to {url}")]
    Connect { url: String },

    /// Website answered with a non-success status
    #[error("HTTP {0}")]
    Status(u16),

    /// Any other transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fetches and reduces the companion website.
#[derive(Debug, Clone)]
pub struct WebsiteFetcher {
    client: Client,
    url: String,
    max_chars: usize,
}

impl WebsiteFetcher {
    pub fn new(config: &WebsiteConfig) -> Result<Self, WebsiteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            max_chars: config.max_chars,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the page and return its text, truncated to `max_chars`.
    pub async fn fetch_text(&self) -> Result<String, WebsiteError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_connect() {
                WebsiteError::Connect {
                    url: self.url.clone(),
                }
            } else {
                WebsiteError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebsiteError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        debug!(url = %self.url, bytes = html.len(), "Fetched website");
        Ok(truncate(&html_to_text(&html), self.max_chars))
    }
}

/// Reduces HTML to its non-empty text lines.
///
/// # Examples
///
/// ```
/// use doma_relay::website::html_to_text;
///
/// let html = "<html><script>x()</script><h1>Title</h1><p>A &amp; B</p></html>";
/// assert_eq!(html_to_text(html), "Title\nA & B");
/// ```
pub fn html_to_text(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, "");
    let separated = TAG.replace_all(&without_code, "\n");

    separated
        .lines()
        .map(|line| decode_entities(line.trim()))
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Cuts `text` to `max_chars` characters, appending a marker when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}
