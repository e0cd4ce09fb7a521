//! Outbound messaging
//!
//! The conversation engine needs exactly three operations from Telegram:
//! send a message, edit a message's text, delete a message. They live behind
//! the [`Messenger`] trait so tests can substitute a recording double for the
//! real Bot API client.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ReplyMarkup};

use crate::core::error::AppResult;

/// Identity of a sent message, what a conversation caches in scratch to
/// later edit the prompt in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub chat: i64,
    pub message: i32,
}

/// The complete outbound footprint of the conversation engine
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(
        &self,
        chat: i64,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> AppResult<MessageRef>;

    async fn edit_message_text(
        &self,
        target: MessageRef,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()>;

    async fn delete_message(&self, target: MessageRef) -> AppResult<()>;
}

/// Messenger over the real Bot API
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(
        &self,
        chat: i64,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> AppResult<MessageRef> {
        let mut request = self.bot.send_message(ChatId(chat), text);
        if let Some(keyboard) = markup {
            request = request.reply_markup(ReplyMarkup::InlineKeyboard(keyboard));
        }
        let sent = request.await?;
        Ok(MessageRef {
            chat,
            message: sent.id.0,
        })
    }

    async fn edit_message_text(
        &self,
        target: MessageRef,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        let mut request =
            self.bot
                .edit_message_text(ChatId(target.chat), MessageId(target.message), text);
        if let Some(keyboard) = markup {
            request = request.reply_markup(keyboard);
        }
        request.await?;
        Ok(())
    }

    async fn delete_message(&self, target: MessageRef) -> AppResult<()> {
        self.bot
            .delete_message(ChatId(target.chat), MessageId(target.message))
            .await?;
        Ok(())
    }
}
