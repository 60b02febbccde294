// ABOUTME: Local console transport: stdin lines in, labelled agent replies out
// ABOUTME: Lets the whole scheduler run without a Telegram account

use anyhow::Result;
use async_trait::async_trait;
use banter_core::traits::{ChatChannel, ChatUser, EventStream, IncomingMessage, MessagingPlatform};
use std::sync::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Channel id every console message is tagged with
pub const CONSOLE_CHANNEL: &str = "console";
/// Sender id of the person at the terminal
pub const CONSOLE_USER: &str = "local";

type LineReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// Reads one message per input line until EOF
pub struct ConsolePlatform {
    user: ChatUser,
    reader: Mutex<Option<LineReader>>,
}

impl ConsolePlatform {
    pub fn stdin() -> Self {
        Self::from_reader(
            BufReader::new(tokio::io::stdin()),
            ChatUser::with_name(CONSOLE_USER, "You"),
        )
    }

    pub fn from_reader<R>(reader: R, user: ChatUser) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            user,
            reader: Mutex::new(Some(Box::new(reader))),
        }
    }
}

#[async_trait]
impl MessagingPlatform for ConsolePlatform {
    async fn event_stream(&self) -> Result<EventStream> {
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| anyhow::anyhow!("Console input is already being read"))?;

        let (tx, rx) = mpsc::channel(64);
        let user = self.user.clone();

        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        let msg =
                            IncomingMessage::new("console", CONSOLE_CHANNEL, user.clone(), line);
                        if tx.send(msg).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => {
                        tracing::info!(platform = "console", "Input closed");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(platform = "console", error = %e, "Failed to read input");
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn bot_user_id(&self) -> &str {
        "banter"
    }

    fn platform_id(&self) -> &'static str {
        "console"
    }
}

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    Lines(mpsc::UnboundedSender<String>),
}

/// Prints each message as `[label] text`
#[derive(Debug, Clone)]
pub struct ConsoleChannel {
    label: String,
    sink: Sink,
}

impl ConsoleChannel {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sink: Sink::Stdout,
        }
    }

    /// Deliver formatted lines to a receiver instead of stdout
    pub fn captured(label: impl Into<String>, lines: mpsc::UnboundedSender<String>) -> Self {
        Self {
            label: label.into(),
            sink: Sink::Lines(lines),
        }
    }

    fn format_line(&self, text: &str) -> String {
        format!("[{}] {}", self.label, text)
    }
}

#[async_trait]
impl ChatChannel for ConsoleChannel {
    fn id(&self) -> &str {
        CONSOLE_CHANNEL
    }

    fn name(&self) -> Option<String> {
        Some(self.label.clone())
    }

    async fn send(&self, text: &str) -> Result<()> {
        let line = self.format_line(text);
        match &self.sink {
            Sink::Stdout => {
                let mut out = tokio::io::stdout();
                out.write_all(line.as_bytes()).await?;
                out.write_all(b"\n").await?;
                out.flush().await?;
            }
            Sink::Lines(tx) => tx
                .send(line)
                .map_err(|_| anyhow::anyhow!("Console output closed"))?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio_stream::StreamExt;

    fn platform(input: &str) -> ConsolePlatform {
        ConsolePlatform::from_reader(
            BufReader::new(Cursor::new(input.as_bytes().to_vec())),
            ChatUser::with_name(CONSOLE_USER, "You"),
        )
    }

    #[tokio::test]
    async fn test_lines_become_messages() {
        let platform = platform("hello there\n\n   \n!banter status\n");
        let stream = platform.event_stream().await.unwrap();
        let messages: Vec<IncomingMessage> = stream.collect().await;

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "hello there");
        assert_eq!(messages[0].channel_id, CONSOLE_CHANNEL);
        assert_eq!(messages[0].sender.id, CONSOLE_USER);
        assert!(!messages[0].sender.is_bot);
        assert_eq!(messages[1].body, "!banter status");
    }

    #[tokio::test]
    async fn test_event_stream_only_once() {
        let platform = platform("hi\n");
        let _stream = platform.event_stream().await.unwrap();
        assert!(platform.event_stream().await.is_err());
    }

    #[tokio::test]
    async fn test_channel_labels_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = ConsoleChannel::captured("SarcasticAI", tx);

        channel.send("Oh, wonderful.").await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), "[SarcasticAI] Oh, wonderful.");
        assert_eq!(channel.id(), CONSOLE_CHANNEL);
        assert!(channel.typing_indicator().is_none());
    }

    #[tokio::test]
    async fn test_send_fails_when_output_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let channel = ConsoleChannel::captured("bot1", tx);
        assert!(channel.send("anyone?").await.is_err());
    }
}
