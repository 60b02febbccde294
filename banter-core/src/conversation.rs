// ABOUTME: Bounded conversation history with turn bookkeeping for one channel
// ABOUTME: Tracks who spoke last, consecutive agent turns, and activity timestamps

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;
use tokio::time::Instant;

/// Who authored a message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Speaker {
    /// The human participant(s)
    User,
    /// Synthetic stimulus injected by the watchdog
    System,
    /// A configured agent, by id
    Agent(String),
}

impl Speaker {
    pub fn agent(id: impl Into<String>) -> Self {
        Self::Agent(id.into())
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }

    /// Agent id if this is an agent
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            Self::Agent(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::System => f.write_str("system"),
            Self::Agent(id) => f.write_str(id),
        }
    }
}

/// One entry in the history. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Shared record of recent messages and turn bookkeeping.
///
/// `turn_count` counts consecutive agent messages since the last user turn.
/// System stimuli update `last_speaker` and `last_message_time` but leave the
/// turn count alone.
#[derive(Debug)]
pub struct ConversationState {
    history: VecDeque<Message>,
    capacity: usize,
    turn_count: u32,
    last_speaker: Option<Speaker>,
    last_message_time: Instant,
    last_user_message_time: Instant,
}

impl ConversationState {
    /// Create an empty state holding at most `capacity` messages (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let now = Instant::now();
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            turn_count: 0,
            last_speaker: None,
            last_message_time: now,
            last_user_message_time: now,
        }
    }

    /// Record a message, evicting the oldest entry when full
    pub fn append(&mut self, speaker: Speaker, content: impl Into<String>) {
        let now = Instant::now();
        self.last_message_time = now;

        if speaker.is_user() {
            self.last_user_message_time = now;
            if self.last_speaker.as_ref() != Some(&Speaker::User) {
                tracing::info!("User message detected, resetting conversation turn count");
                self.turn_count = 0;
            }
        }

        if self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(Message {
            speaker: speaker.clone(),
            content: content.into(),
            timestamp: Utc::now(),
        });

        if let Speaker::Agent(ref id) = speaker {
            self.turn_count += 1;
            tracing::info!(agent = %id, turn = self.turn_count, "Agent conversation turn");
        }
        self.last_speaker = Some(speaker);
    }

    /// Whether `agent_id` may respond: there is something to answer and it
    /// did not author the most recent message
    pub fn eligible(&self, agent_id: &str) -> bool {
        !self.history.is_empty()
            && self.last_speaker.as_ref().and_then(Speaker::agent_id) != Some(agent_id)
    }

    /// Clear history and turn bookkeeping.
    ///
    /// `last_message_time` is refreshed so the watchdog does not immediately
    /// see a stall; `last_user_message_time` is left as is.
    pub fn reset(&mut self) {
        self.history.clear();
        self.turn_count = 0;
        self.last_speaker = None;
        self.last_message_time = Instant::now();
        tracing::info!("Conversation history has been reset");
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = &Message> {
        self.history.iter()
    }

    /// Owned copy of the history, oldest first
    pub fn snapshot(&self) -> Vec<Message> {
        self.history.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn last_speaker(&self) -> Option<&Speaker> {
        self.last_speaker.as_ref()
    }

    pub fn last_message_time(&self) -> Instant {
        self.last_message_time
    }

    pub fn last_user_message_time(&self) -> Instant {
        self.last_user_message_time
    }
}
