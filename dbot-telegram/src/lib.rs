//! # dbot-telegram
//!
//! Telegram transport for streamed replies: [`TelegramSink`] implements [`dbot_core::Sink`] over teloxide,
//! [`TelegramConfig`] loads the bot token and API URL. No pacing or splitting logic lives here; that is
//! dbot-stream's job.

mod config;
mod errors;
mod sink_adapter;

pub use config::TelegramConfig;
pub use errors::{classify_error, is_message_gone_error, is_message_not_modified_error};
pub use sink_adapter::{parse_message_id, TelegramSink, TELEGRAM_MAX_MESSAGE_LENGTH};
