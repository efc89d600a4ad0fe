//! Telegram Bot API integration
//!
//! # Submodules
//!
//! - [`types`]: Bot API objects and request bodies
//! - [`client`]: HTTP client, also the production [`crate::delivery::Messenger`]
//! - [`bot`]: Update loop, `/start` subscription and menu actions

pub mod bot;
pub mod client;
pub mod types;

pub use bot::{BotAction, TelegramBot};
pub use client::{TelegramClient, TelegramClientConfig, TelegramError};
