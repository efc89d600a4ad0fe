//! Telegram Bot API client.
//!
//! Thin reqwest wrapper over the handful of Bot API methods the relay
//! needs. Every method goes through [`TelegramClient::call`], which unwraps
//! the `{ok, result, description}` envelope.
//!
//! The bot token is part of every request URL, so transport errors are
//! stripped of their URL before being returned.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use super::types::{
    ApiResponse, EditMessageTextRequest, GetUpdatesRequest, InlineKeyboardMarkup, Message,
    ParseMode, SendMessageRequest, Update, User,
};
use crate::config::TelegramConfig;
use crate::delivery::{ChatId, Messenger, SendFailure};

/// Errors that can occur during Bot API calls.
#[derive(Error, Debug)]
pub enum TelegramError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Bot API rejected the call.
    #[error("Telegram API error ({code}): {description}")]
    Api {
        /// `error_code` from the envelope, or the HTTP status.
        code: i64,
        /// Human readable reason from the API.
        description: String,
    },

    /// Response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<TelegramError> for SendFailure {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::Api { description, .. } => SendFailure::new(description),
            other => SendFailure::new(other.to_string()),
        }
    }
}

/// Bot API client configuration.
#[derive(Debug, Clone)]
pub struct TelegramClientConfig {
    /// API root, normally `https://api.telegram.org`.
    pub api_base: String,
    /// Bot token.
    pub token: String,
    /// Seconds `getUpdates` may hold the connection open.
    pub long_poll_timeout_secs: u64,
    /// Timeout for every other request.
    pub request_timeout: Duration,
}

impl From<&TelegramConfig> for TelegramClientConfig {
    fn from(config: &TelegramConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
            long_poll_timeout_secs: config.long_poll_timeout_secs,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// Telegram Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    config: TelegramClientConfig,
}

impl TelegramClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError::Http` if the HTTP client cannot be created.
    pub fn new(config: TelegramClientConfig) -> Result<Self, TelegramError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    /// Invokes a Bot API method and unwraps the response envelope.
    pub async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_with_timeout(method, params, self.config.request_timeout)
            .await
    }

    async fn call_with_timeout<P, R>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
    ) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!(
            "{}/bot{}/{}",
            self.config.api_base, self.config.token, method
        );

        let response = self
            .client
            .post(&url)
            .json(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TelegramError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TelegramError::Http(e.without_url()))?;

        let envelope: ApiResponse<R> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(TelegramError::Api {
                    code: i64::from(status.as_u16()),
                    description: body,
                });
            }
            Err(e) => return Err(e.into()),
        };

        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            other => {
                let code = other
                    .error_code
                    .unwrap_or_else(|| i64::from(status.as_u16()));
                let description = other
                    .description
                    .unwrap_or_else(|| "no description".to_string());
                debug!(method, code, description = %description, "Bot API call failed");
                Err(TelegramError::Api { code, description })
            }
        }
    }

    /// Returns the bot's own user; used as a credentials check.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.config.long_poll_timeout_secs,
            allowed_updates: vec!["message".to_string(), "callback_query".to_string()],
        };
        let budget =
            self.config.request_timeout + Duration::from_secs(self.config.long_poll_timeout_secs);
        self.call_with_timeout("getUpdates", &request, budget).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, TelegramError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            reply_markup,
        };
        self.call("sendMessage", &request).await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let request = EditMessageTextRequest {
            chat_id,
            message_id,
            text,
            parse_mode,
            reply_markup,
        };
        // result is the edited Message, or `true` for inline messages
        let _: JsonValue = self.call("editMessageText", &request).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &serde_json::json!({ "callback_query_id": callback_query_id }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), SendFailure> {
        self.send_message(chat.0, text, None, None)
            .await
            .map(|_| ())
            .map_err(SendFailure::from)
    }
}
