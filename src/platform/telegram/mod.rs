// ABOUTME: Telegram transport for banter using teloxide long polling
// ABOUTME: Turns text updates into IncomingMessage values and exposes per-bot channels

pub mod channel;

pub use channel::TelegramChannel;

use anyhow::{Context, Result};
use async_trait::async_trait;
use banter_core::traits::{ChatUser, EventStream, IncomingMessage, MessagingPlatform};
use teloxide::prelude::*;
use teloxide::types::{MediaKind, MessageKind, Update, UpdateKind};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Long-poll timeout handed to getUpdates, in seconds
const POLL_TIMEOUT_SECS: u32 = 30;
/// Back-off after a failed poll
const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Inbound side of the Telegram transport, driven by the primary bot
pub struct TelegramPlatform {
    bot: Bot,
    /// Bot's numeric user ID as a string
    bot_user_id: String,
    /// The group chat the agents live in
    chat_id: ChatId,
    poller: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TelegramPlatform {
    /// Connect the primary bot, resolving its user ID via `getMe`
    pub async fn new(bot_token: &str, chat_id: i64) -> Result<Self> {
        let bot = Bot::new(bot_token);

        let me = bot.get_me().await.context("Failed to call Telegram getMe")?;
        let bot_user_id = me.id.0.to_string();

        tracing::info!(
            bot_username = %me.username(),
            bot_id = %bot_user_id,
            chat_id,
            "Telegram bot authenticated"
        );

        Ok(Self {
            bot,
            bot_user_id,
            chat_id: ChatId(chat_id),
            poller: std::sync::Mutex::new(None),
        })
    }

    /// Outbound channel for the primary bot
    pub fn channel(&self) -> TelegramChannel {
        TelegramChannel::new(self.chat_id, self.bot.clone(), None)
    }
}

/// Convert one Telegram update into an inbound message, skipping anything but text
fn incoming_from_update(update: &Update) -> Option<IncomingMessage> {
    let message = match &update.kind {
        UpdateKind::Message(msg) => msg,
        _ => return None,
    };

    let body = match &message.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(text) => text.text.clone(),
            _ => return None,
        },
        _ => return None,
    };

    let from = message.from.as_ref()?;
    let display_name = match &from.last_name {
        Some(last) => format!("{} {}", from.first_name, last),
        None => from.first_name.clone(),
    };

    let mut sender = ChatUser::with_name(from.id.0.to_string(), display_name);
    sender.is_bot = from.is_bot;

    Some(IncomingMessage {
        platform_id: "telegram".to_string(),
        channel_id: message.chat.id.0.to_string(),
        sender,
        body,
        event_id: message.id.0.to_string(),
        timestamp: message.date.timestamp(),
    })
}

#[async_trait]
impl MessagingPlatform for TelegramPlatform {
    async fn event_stream(&self) -> Result<EventStream> {
        let (tx, rx) = mpsc::channel(256);
        let bot = self.bot.clone();
        let bot_user_id = self.bot_user_id.clone();

        let handle = tokio::spawn(async move {
            let mut offset: i32 = 0;

            loop {
                let updates = match bot
                    .get_updates()
                    .offset(offset)
                    .timeout(POLL_TIMEOUT_SECS)
                    .await
                {
                    Ok(updates) => updates,
                    Err(e) => {
                        tracing::warn!(
                            platform = "telegram",
                            error = %e,
                            "Long polling error, retrying in 5s"
                        );
                        tokio::time::sleep(RETRY_DELAY).await;
                        continue;
                    }
                };

                for update in &updates {
                    offset = update.id.as_offset();

                    let Some(msg) = incoming_from_update(update) else {
                        continue;
                    };
                    if msg.sender.id == bot_user_id {
                        continue;
                    }

                    if tx.send(msg).await.is_err() {
                        tracing::warn!(platform = "telegram", "Event stream receiver dropped");
                        return;
                    }
                }
            }
        });

        if let Some(old) = self
            .poller
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle)
        {
            old.abort();
        }

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    fn platform_id(&self) -> &'static str {
        "telegram"
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!(platform = "telegram", "Shutting down Telegram platform");
        if let Some(poller) = self.poller.lock().unwrap_or_else(|e| e.into_inner()).take() {
            poller.abort();
        }
        Ok(())
    }
}
