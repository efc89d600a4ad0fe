//! Telegram update loop and interactive handlers
//!
//! The bot long-polls `getUpdates`, subscribes chats on `/start`, and
//! answers the inline-keyboard actions of the main menu. Handler failures
//! are logged per update and never stop the loop.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::client::{TelegramClient, TelegramError};
use super::types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, ParseMode, Update};
use crate::delivery::{BroadcastReport, Broadcaster, ChatId};
use crate::engine::extractor::find_name_type_pairs;
use crate::relay::Relay;
use crate::upstream::{DomaClient, UpstreamError};
use crate::website::{truncate, WebsiteError, WebsiteFetcher};

const ERROR_BACKOFF: Duration = Duration::from_secs(2);
const MAX_JSON_CHARS: usize = 3000;

/// Text sent to every subscriber by the broadcast test action.
pub const TEST_BROADCAST: &str =
    "🧪 Test message from Doma Bot!\n\nThis is a test broadcast to all users who started the bot.";

/// Inline keyboard actions, identified by their callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotAction {
    SendAlert,
    GetWebsiteText,
    BroadcastTest,
    MainMenu,
}

impl BotAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "send_alert" => Some(Self::SendAlert),
            "get_website_text" => Some(Self::GetWebsiteText),
            "broadcast_test" => Some(Self::BroadcastTest),
            "main_menu" => Some(Self::MainMenu),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SendAlert => "send_alert",
            Self::GetWebsiteText => "get_website_text",
            Self::BroadcastTest => "broadcast_test",
            Self::MainMenu => "main_menu",
        }
    }

    fn button(self, text: &str) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(text, self.as_str())
    }
}

/// Telegram front end of the relay.
pub struct TelegramBot {
    client: TelegramClient,
    relay: Relay,
    upstream: DomaClient,
    website: WebsiteFetcher,
    broadcaster: Broadcaster,
}

impl TelegramBot {
    pub fn new(
        client: TelegramClient,
        relay: Relay,
        upstream: DomaClient,
        website: WebsiteFetcher,
    ) -> Self {
        let broadcaster = Broadcaster::new(Arc::new(client.clone()), relay.subscribers().clone());
        Self {
            client,
            relay,
            upstream,
            website,
            broadcaster,
        }
    }

    /// Verify credentials, mark the relay ready, then process updates
    /// until cancelled.
    ///
    /// # Errors
    ///
    /// Returns the `getMe` failure; later polling errors are logged and
    /// retried after a short pause.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), TelegramError> {
        let me = self.client.get_me().await?;
        info!(bot_id = me.id, username = ?me.username, "Connected to Telegram");
        self.relay.mark_ready();

        let mut offset: Option<i64> = None;
        loop {
            let result = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.client.get_updates(offset) => result,
            };

            match result {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch Telegram updates");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        info!("Telegram bot stopped");
        Ok(())
    }

    /// Dispatch one update to its handler.
    pub async fn handle_update(&self, update: Update) {
        let Update {
            update_id,
            message,
            callback_query,
        } = update;

        let span = info_span!("telegram_update", update_id);
        let result = async {
            if let Some(query) = callback_query {
                self.handle_callback(query).await
            } else if let Some(message) = message {
                self.handle_message(message).await
            } else {
                Ok(())
            }
        }
        .instrument(span)
        .await;

        if let Err(e) = result {
            warn!(update_id, error = %e, "Failed to handle update");
        }
    }

    async fn handle_message(&self, message: Message) -> Result<(), TelegramError> {
        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };
        if !is_start_command(text) {
            debug!(chat_id = message.chat.id, "Ignoring non-command message");
            return Ok(());
        }

        let chat = ChatId(message.chat.id);
        let added = self.relay.subscribers().add(chat).await;
        let total = self.relay.subscribers().len().await;
        info!(chat_id = %chat, added, total, "Subscriber registered");

        self.client
            .send_message(
                chat.0,
                &menu_text("🤖 Welcome to Doma API Bot!", self.website.url()),
                None,
                Some(&main_menu_keyboard()),
            )
            .await?;
        Ok(())
    }

    async fn handle_callback(&self, query: CallbackQuery) -> Result<(), TelegramError> {
        self.client.answer_callback_query(&query.id).await?;

        let Some(action) = query.data.as_deref().and_then(BotAction::parse) else {
            debug!(data = ?query.data, "Unknown callback data");
            return Ok(());
        };
        let Some(message) = query.message else {
            return Ok(());
        };
        let (chat_id, message_id) = (message.chat.id, message.message_id);

        debug!(action = action.as_str(), chat_id, "Handling callback");
        match action {
            BotAction::SendAlert => {
                self.edit(chat_id, message_id, "🔄 Processing alert... Please wait...", None, None)
                    .await?;
                let text = alert_text(self.upstream.poll().await);
                let keyboard =
                    InlineKeyboardMarkup::single_column(vec![BotAction::SendAlert.button("🔄 Try Again")]);
                self.edit(chat_id, message_id, &text, Some(ParseMode::Markdown), Some(&keyboard))
                    .await
            }
            BotAction::GetWebsiteText => {
                self.edit(chat_id, message_id, "🔄 Fetching website content... Please wait...", None, None)
                    .await?;
                let text = website_text(self.website.url(), self.website.fetch_text().await);
                let keyboard = retry_keyboard(BotAction::GetWebsiteText);
                self.edit(chat_id, message_id, &text, Some(ParseMode::Markdown), Some(&keyboard))
                    .await
            }
            BotAction::BroadcastTest => {
                if self.relay.subscribers().is_empty().await {
                    return self
                        .edit(
                            chat_id,
                            message_id,
                            "❌ No users to broadcast to. Users need to start the bot first.",
                            None,
                            None,
                        )
                        .await;
                }
                self.edit(chat_id, message_id, "🔄 Broadcasting test message... Please wait...", None, None)
                    .await?;
                let report = self.broadcaster.broadcast(TEST_BROADCAST).await;
                let total = self.relay.subscribers().len().await;
                let keyboard = retry_keyboard(BotAction::BroadcastTest);
                self.edit(chat_id, message_id, &broadcast_summary(&report, total), None, Some(&keyboard))
                    .await
            }
            BotAction::MainMenu => {
                let text = menu_text("🤖 Doma API Bot - Main Menu", self.website.url());
                self.edit(chat_id, message_id, &text, None, Some(&main_menu_keyboard()))
                    .await
            }
        }
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        self.client
            .edit_message_text(chat_id, message_id, text, parse_mode, keyboard)
            .await
    }
}

/// Returns true for `/start`, `/start@bot` and `/start <payload>`.
pub fn is_start_command(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .and_then(|command| command.split('@').next())
        .is_some_and(|command| command == "/start")
}

pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column(vec![
        BotAction::SendAlert.button("🚨 Send Alert"),
        BotAction::GetWebsiteText.button("🌐 Get Website Text"),
        BotAction::BroadcastTest.button("📢 Broadcast Test"),
    ])
}

fn retry_keyboard(action: BotAction) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column(vec![
        action.button("🔄 Try Again"),
        BotAction::MainMenu.button("🏠 Main Menu"),
    ])
}

fn menu_text(title: &str, website_url: &str) -> String {
    format!(
        "{}\n\nAvailable commands:\n\
         • Send Alert - Check API response\n\
         • Get Website Text - Fetch text from {}\n\
         • Broadcast Test - Send test message to all users",
        title, website_url
    )
}

/// Renders the result of an on-demand upstream poll.
pub fn alert_text(result: Result<JsonValue, UpstreamError>) -> String {
    let payload = match result {
        Ok(payload) => payload,
        Err(e) => return format!("❌ Error: {}", e),
    };

    let pretty = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
    let mut text = format!(
        "✅ Alert sent successfully!\n\n📊 API Response:\n```json\n{}\n```\n\n",
        truncate(&pretty, MAX_JSON_CHARS)
    );

    let entries = find_name_type_pairs(&payload);
    if entries.is_empty() {
        text.push_str("⚠️ No name/type data found in response\n");
    } else {
        text.push_str("📋 Extracted Data:\n");
        for (i, entry) in entries.iter().enumerate() {
            text.push_str(&format!(
                "{}. Name: `{}`\n   Type: `{}`\n\n",
                i + 1,
                entry.name,
                entry.entry_type
            ));
        }
    }
    text
}

/// Renders the result of a website fetch.
pub fn website_text(url: &str, result: Result<String, WebsiteError>) -> String {
    match result {
        Ok(content) => format!(
            "✅ Website content fetched successfully!\n\n🌐 Content from {}:\n\n```\n{}\n```",
            url, content
        ),
        Err(WebsiteError::Connect { url }) => format!(
            "❌ Could not connect to {}\n\nMake sure the website is running at {}",
            url, url
        ),
        Err(WebsiteError::Status(code)) => format!("❌ Error fetching website: HTTP {}", code),
        Err(e) => format!("❌ Error: {}", e),
    }
}

/// Renders the outcome of a broadcast test.
pub fn broadcast_summary(report: &BroadcastReport, total_users: usize) -> String {
    format!(
        "📢 Broadcast completed!\n\n✅ Successfully sent to: {} users\n❌ Failed to send to: {} users\n👥 Total users: {}",
        report.delivered,
        report.failed + report.pruned,
        total_users
    )
}
