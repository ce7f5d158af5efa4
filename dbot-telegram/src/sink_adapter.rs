//! Wraps teloxide::Bot and implements [`dbot_core::Sink`] for one chat. Production code streams replies
//! into Telegram messages; tests substitute another Sink impl.

use crate::errors::{classify_error, is_message_not_modified_error};
use async_trait::async_trait;
use dashmap::DashMap;
use dbot_core::{Sink, SinkError, SinkResult, UnitHandle, UnitOptions};
use teloxide::{prelude::*, types::ChatId, types::MessageId};
use tracing::debug;

/// Telegram's text limit per message.
pub const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Parses a unit id into a Telegram message id.
pub fn parse_message_id(s: &str) -> SinkResult<i32> {
    s.parse()
        .map_err(|_| SinkError::Other(format!("Invalid message_id for edit: {}", s)))
}

/// Sink writing into one Telegram chat.
///
/// The Bot API cannot read a message back, so [`Sink::fetch_current_content`] answers from a local
/// mirror of what this sink last wrote. Edits made by anyone else are invisible to it.
pub struct TelegramSink {
    bot: teloxide::Bot,
    chat_id: ChatId,
    mirror: DashMap<String, String>,
}

impl TelegramSink {
    pub fn new(bot: teloxide::Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
            mirror: DashMap::new(),
        }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id.0
    }
}

#[async_trait]
impl Sink for TelegramSink {
    fn max_unit_length(&self) -> usize {
        TELEGRAM_MAX_MESSAGE_LENGTH
    }

    async fn create_unit(&self, content: &str, options: &UnitOptions) -> SinkResult<UnitHandle> {
        let mut request = self.bot.send_message(self.chat_id, content.to_string());
        if options.silent {
            request = request.disable_notification(true);
        }
        if options.protect_content {
            request = request.protect_content(true);
        }
        let sent = request
            .await
            .map_err(|e| classify_error("", &e.to_string()))?;

        let unit = UnitHandle::new(sent.id.to_string());
        self.mirror.insert(unit.id.clone(), content.to_string());
        debug!(chat_id = self.chat_id.0, unit = %unit, "message sent");
        Ok(unit)
    }

    async fn fetch_current_content(&self, unit: &UnitHandle) -> SinkResult<String> {
        self.mirror
            .get(&unit.id)
            .map(|c| c.value().clone())
            .ok_or_else(|| SinkError::NotFound(unit.id.clone()))
    }

    async fn edit_unit(&self, unit: &UnitHandle, content: &str) -> SinkResult<()> {
        let id = parse_message_id(&unit.id)?;
        match self
            .bot
            .edit_message_text(self.chat_id, MessageId(id), content)
            .await
        {
            Ok(_) => {}
            Err(e) => {
                let error_str = e.to_string();
                if !is_message_not_modified_error(&error_str) {
                    let err = classify_error(&unit.id, &error_str);
                    if err.is_fatal() {
                        self.mirror.remove(&unit.id);
                    }
                    return Err(err);
                }
            }
        }
        self.mirror.insert(unit.id.clone(), content.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_sink_new() {
        let sink = TelegramSink::new(teloxide::Bot::new("dummy_token"), 42);
        assert_eq!(sink.chat_id(), 42);
        assert_eq!(sink.max_unit_length(), 4096);
    }

    #[test]
    fn test_parse_message_id_valid() {
        assert_eq!(parse_message_id("123").unwrap(), 123);
        assert_eq!(parse_message_id("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_message_id_invalid() {
        assert!(parse_message_id("").is_err());
        assert!(parse_message_id("abc").is_err());
        assert!(parse_message_id("12.3").is_err());
    }

    #[tokio::test]
    async fn test_fetch_unknown_unit_is_not_found() {
        let sink = TelegramSink::new(teloxide::Bot::new("dummy_token"), 42);
        let err = sink
            .fetch_current_content(&UnitHandle::new("9"))
            .await
            .unwrap_err();
        assert_eq!(err, SinkError::NotFound("9".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_reads_mirror() {
        let sink = TelegramSink::new(teloxide::Bot::new("dummy_token"), 42);
        sink.mirror.insert("5".to_string(), "partial reply".to_string());
        let content = sink
            .fetch_current_content(&UnitHandle::new("5"))
            .await
            .unwrap();
        assert_eq!(content, "partial reply");
    }
}
