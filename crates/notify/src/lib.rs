//! Lifecycle notifications.
//!
//! The scheduler reports withdrawal milestones through a [`Notifier`]. The
//! Telegram transport targets a chat (optionally a forum topic); when no
//! transport is configured the noop notifier drops messages silently.

use async_trait::async_trait;
use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    requests::Request,
    types::{ChatId, MessageId, ThreadId},
    Bot,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Telegram transport for lifecycle notifications.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
    topic_id: Option<ThreadId>,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: i64, topic_id: Option<i32>) -> Self {
        Self {
            bot: Bot::new(bot_token),
            chat_id: ChatId(chat_id),
            topic_id: topic_id.map(|id| ThreadId(MessageId(id))),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let mut request = self.bot.send_message(self.chat_id, text);
        if let Some(topic_id) = self.topic_id {
            request = request.message_thread_id(topic_id);
        }
        request.send().await?;
        Ok(())
    }
}

/// Notifier used when no transport is configured; drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        debug!(text, "notification dropped (no transport configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_notifier_accepts_everything() {
        let notifier = NoopNotifier;
        notifier.notify("anything").await.unwrap();
    }
}
