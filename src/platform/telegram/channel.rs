// ABOUTME: Telegram chat wrapped as an outbound channel for one bot identity
// ABOUTME: Sends replies in 4096-char chunks and drives the "typing" chat action

use anyhow::{Context, Result};
use async_trait::async_trait;
use banter_core::traits::{ChatChannel, TypingIndicator};
use teloxide::prelude::*;
use teloxide::types::ChatAction;

/// Maximum message length for Telegram Bot API
const MAX_MESSAGE_LENGTH: usize = 4096;

/// A Telegram chat as seen by one bot account
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    chat_id: ChatId,
    /// String representation of chat_id for the id() accessor
    chat_id_str: String,
    bot: Bot,
    /// Label used in logs, usually the agent speaking through this bot
    label: Option<String>,
}

impl TelegramChannel {
    pub fn new(chat_id: ChatId, bot: Bot, label: Option<String>) -> Self {
        Self {
            chat_id_str: chat_id.0.to_string(),
            chat_id,
            bot,
            label,
        }
    }

    /// Channel for a bot built from its token
    pub fn from_token(chat_id: i64, token: &str, label: Option<String>) -> Self {
        Self::new(ChatId(chat_id), Bot::new(token), label)
    }
}

#[async_trait]
impl ChatChannel for TelegramChannel {
    fn id(&self) -> &str {
        &self.chat_id_str
    }

    fn name(&self) -> Option<String> {
        self.label.clone()
    }

    async fn send(&self, text: &str) -> Result<()> {
        let chunks = chunk_text(text, MAX_MESSAGE_LENGTH);
        deliver_chunks(&chunks, |chunk| async move {
            self.bot.send_message(self.chat_id, chunk).await.map(|_| ())
        })
        .await
        .with_context(|| format!("Failed to send Telegram message to {}", self.chat_id_str))?;
        tracing::debug!(
            platform = "telegram",
            chat_id = %self.chat_id_str,
            label = self.label.as_deref().unwrap_or("primary"),
            len = text.len(),
            "Message sent"
        );
        Ok(())
    }

    fn typing_indicator(&self) -> Option<&dyn TypingIndicator> {
        Some(self)
    }
}

#[async_trait]
impl TypingIndicator for TelegramChannel {
    async fn set_typing(&self, typing: bool) -> Result<()> {
        if typing {
            self.bot
                .send_chat_action(self.chat_id, ChatAction::Typing)
                .await
                .context("Failed to send typing action")?;
        }
        // Telegram typing indicators expire on their own
        Ok(())
    }
}

/// Send chunks in order, stopping at the first failure.
///
/// The error says how many chunks already reached the chat.
async fn deliver_chunks<'a, F, Fut, E>(chunks: &[&'a str], mut send: F) -> Result<()>
where
    F: FnMut(&'a str) -> Fut,
    Fut: std::future::Future<Output = std::result::Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    for (delivered, chunk) in chunks.iter().enumerate() {
        if let Err(e) = send(chunk).await {
            if delivered > 0 {
                tracing::warn!(
                    platform = "telegram",
                    delivered,
                    total = chunks.len(),
                    "Reply only partly delivered"
                );
            }
            return Err(anyhow::Error::new(e).context(format!(
                "{} of {} chunks delivered",
                delivered,
                chunks.len()
            )));
        }
    }
    Ok(())
}

/// Largest char boundary at or below `idx`
fn floor_char_boundary(text: &str, idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    let mut i = idx;
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Split text into chunks at line boundaries, falling back to character boundaries
fn chunk_text(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining);
            break;
        }

        let limit = floor_char_boundary(remaining, max_len);
        let split_at = match remaining[..limit].rfind('\n') {
            Some(pos) => pos + 1,
            // A single char wider than max_len still has to go somewhere
            None if limit == 0 => remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len()),
            None => limit,
        };

        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }

    chunks
}
