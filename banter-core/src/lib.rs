// ABOUTME: Platform-agnostic conversation orchestration for several chatting agents
// ABOUTME: Turn bookkeeping, response dispatch, inactivity watchdog, and admin commands

pub mod commands;
pub mod config;
pub mod context;
pub mod conversation;
pub mod dispatcher;
pub mod metrics;
pub mod orchestrator;
pub mod profile;
pub mod prompt;
pub mod traits;
pub mod watchdog;

pub use commands::{parse_message, AdminCommand, Command, ParseResult};
pub use config::Config;
pub use context::{AgentStatus, ConversationContext, Settings};
pub use conversation::{ConversationState, Message, Speaker};
pub use dispatcher::{DispatchOutcome, ResponseDispatcher, APOLOGY_RESPONSE, FILLER_RESPONSE};
pub use orchestrator::{HandleResult, Orchestrator, OrchestratorConfig};
pub use profile::{AgentProfile, DelayRange, ProfileOverride};
pub use traits::{
    AgentChannels, ChatChannel, ChatUser, EventStream, IncomingMessage, MessagingPlatform,
    SharedChannel, TypingIndicator,
};
pub use watchdog::{InactivityWatchdog, TickOutcome};

// Re-export banter-agent types
pub use banter_agent::{
    BackendRegistry, ChatMessage, GenerationBackend, GenerationRequest, Role, SharedBackend,
};
