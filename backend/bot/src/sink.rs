use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use vidgate_access::MessageSink;
use vidgate_core::{GateError, Result, UserId};

/// Telegram-backed delivery for broadcasts and notifications.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn deliver(&self, user_id: UserId, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(user_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|err| GateError::Delivery {
                user_id,
                reason: err.to_string(),
            })?;
        Ok(())
    }
}
