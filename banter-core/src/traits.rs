// ABOUTME: Transport traits the scheduler consumes
// ABOUTME: Inbound event stream, outbound channels, typing indicators, per-agent identities

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;

// =============================================================================
// User Identity
// =============================================================================

/// Identity of a chat user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatUser {
    /// Unique identifier on the platform
    pub id: String,
    /// Display name
    pub display_name: Option<String>,
    /// Whether the platform reports this account as a bot
    pub is_bot: bool,
}

impl ChatUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            is_bot: false,
        }
    }

    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(name.into()),
            is_bot: false,
        }
    }

    pub fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }
}

// =============================================================================
// Incoming Message
// =============================================================================

/// Incoming message from a chat platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Which platform this message came from (e.g., "telegram", "console")
    pub platform_id: String,
    /// The channel this message was sent in
    pub channel_id: String,
    /// The user who sent the message
    pub sender: ChatUser,
    /// Message body (text content)
    pub body: String,
    /// Platform-specific event ID
    pub event_id: String,
    /// Timestamp in seconds since Unix epoch
    pub timestamp: i64,
}

impl IncomingMessage {
    /// Build a message stamped with the current time
    pub fn new(
        platform_id: impl Into<String>,
        channel_id: impl Into<String>,
        sender: ChatUser,
        body: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            platform_id: platform_id.into(),
            channel_id: channel_id.into(),
            sender,
            body: body.into(),
            event_id: now.timestamp_nanos_opt().unwrap_or_default().to_string(),
            timestamp: now.timestamp(),
        }
    }
}

// =============================================================================
// Platform
// =============================================================================

/// Boxed stream type for platform events
pub type EventStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// Source of inbound messages.
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    /// Receive incoming messages as a stream
    async fn event_stream(&self) -> Result<EventStream>;

    /// Bot's user ID on this platform
    fn bot_user_id(&self) -> &str;

    /// Platform identifier (e.g., "telegram", "console")
    fn platform_id(&self) -> &'static str;

    /// Gracefully shut down the platform connection
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Channels
// =============================================================================

/// A chat channel agents speak into
#[async_trait]
pub trait ChatChannel: Send + Sync + Debug {
    /// Unique identifier for this channel
    fn id(&self) -> &str;

    /// Human-readable name of the channel, if available
    fn name(&self) -> Option<String> {
        None
    }

    /// Send a text message to this channel
    async fn send(&self, text: &str) -> Result<()>;

    /// Optional: typing indicator support
    fn typing_indicator(&self) -> Option<&dyn TypingIndicator> {
        None
    }
}

/// Typing indicator capability
#[async_trait]
pub trait TypingIndicator: Send + Sync {
    /// Set typing indicator on/off
    async fn set_typing(&self, typing: bool) -> Result<()>;
}

pub type SharedChannel = Arc<dyn ChatChannel>;

/// Outbound channels, one per agent identity with a shared fallback
#[derive(Debug, Clone)]
pub struct AgentChannels {
    primary: SharedChannel,
    per_agent: HashMap<String, SharedChannel>,
}

impl AgentChannels {
    pub fn new(primary: SharedChannel) -> Self {
        Self {
            primary,
            per_agent: HashMap::new(),
        }
    }

    /// Route an agent's replies through its own identity
    pub fn with_agent(mut self, agent_id: impl Into<String>, channel: SharedChannel) -> Self {
        self.per_agent.insert(agent_id.into(), channel);
        self
    }

    pub fn primary(&self) -> &SharedChannel {
        &self.primary
    }

    pub fn for_agent(&self, agent_id: &str) -> &SharedChannel {
        self.per_agent.get(agent_id).unwrap_or(&self.primary)
    }
}
