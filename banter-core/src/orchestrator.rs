// ABOUTME: Routes inbound chat messages into the conversation and triggers agent replies
// ABOUTME: Also executes admin commands against the shared context

use crate::{
    commands::{parse_message, AdminCommand, Command, ParseResult},
    context::ConversationContext,
    conversation::Speaker,
    dispatcher::ResponseDispatcher,
    metrics, prompt,
    traits::{EventStream, IncomingMessage},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_stream::StreamExt;

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Only messages from this channel are considered (None = any channel)
    pub channel_id: Option<String>,
    /// Sender ids never treated as the human, typically our own bot accounts
    pub ignored_senders: Vec<String>,
    /// Command prefix (e.g., "!banter")
    pub command_prefix: String,
    /// User ids allowed to run admin commands (empty = nobody)
    pub admin_users: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_id: None,
            ignored_senders: Vec::new(),
            command_prefix: "!banter".to_string(),
            admin_users: Vec::new(),
        }
    }
}

/// Result of handling a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleResult {
    /// Appended to the conversation; these agents were dispatched, in order
    Conversed { dispatched: Vec<String> },
    /// A command was answered (or refused)
    Command(String),
    /// Message was ignored (other channel, bot author, empty)
    Ignored,
}

pub struct Orchestrator {
    dispatcher: ResponseDispatcher,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(dispatcher: ResponseDispatcher, config: OrchestratorConfig) -> Self {
        Self { dispatcher, config }
    }

    fn ctx(&self) -> &Arc<ConversationContext> {
        self.dispatcher.context()
    }

    pub fn dispatcher(&self) -> &ResponseDispatcher {
        &self.dispatcher
    }

    /// Handle an incoming message
    pub async fn handle_message(&self, msg: IncomingMessage) -> Result<HandleResult> {
        if let Some(ref channel_id) = self.config.channel_id {
            if &msg.channel_id != channel_id {
                tracing::trace!(channel = %msg.channel_id, "Message from another channel");
                return Ok(HandleResult::Ignored);
            }
        }

        if msg.sender.is_bot || self.config.ignored_senders.contains(&msg.sender.id) {
            return Ok(HandleResult::Ignored);
        }

        let body = prompt::strip_mentions(&msg.body);
        match parse_message(&body, &self.config.command_prefix) {
            ParseResult::Ignore => Ok(HandleResult::Ignored),
            ParseResult::Command(cmd) => self.handle_command(&msg, cmd).await,
            ParseResult::Message(text) => Ok(self.converse(text)),
        }
    }

    /// Append a user message and dispatch every eligible agent that passes
    /// its chance check
    fn converse(&self, text: String) -> HandleResult {
        let ctx = self.ctx();
        ctx.append(Speaker::User, text);

        if ctx.is_paused() {
            tracing::debug!("Conversation paused, not dispatching agents");
            return HandleResult::Conversed { dispatched: Vec::new() };
        }

        let mut dispatched = Vec::new();
        for agent in ctx.agents() {
            if !ctx.eligible(&agent.id) {
                continue;
            }
            if !agent.wants_to_respond(&mut rand::thread_rng()) {
                tracing::info!(agent = %agent.name, "Agent chose not to respond based on chance");
                continue;
            }
            self.dispatcher.dispatch(&agent.id, None);
            dispatched.push(agent.id);
        }
        HandleResult::Conversed { dispatched }
    }

    fn is_admin(&self, user_id: &str) -> bool {
        self.config.admin_users.iter().any(|u| u == user_id)
    }

    async fn reply(&self, text: &str) -> Result<()> {
        self.dispatcher
            .channels()
            .primary()
            .send(text)
            .await
            .context("Failed to send command reply")
    }

    /// Handle a parsed command
    async fn handle_command(&self, msg: &IncomingMessage, cmd: Command) -> Result<HandleResult> {
        let admin_cmd = cmd.as_admin();
        metrics::record_command(&cmd.name);
        tracing::info!(command = %cmd.name, sender = %msg.sender.id, "Admin command");

        if admin_cmd.requires_admin() && !self.is_admin(&msg.sender.id) {
            tracing::warn!(command = %cmd.name, sender = %msg.sender.id, "Admin command refused");
            self.reply("You do not have permission to use this command.").await?;
            return Ok(HandleResult::Command(cmd.name));
        }

        if let Some(text) = self.execute(admin_cmd) {
            self.reply(&text).await?;
        }
        Ok(HandleResult::Command(cmd.name))
    }

    /// Apply a command to the shared context; returns the reply, if any
    fn execute(&self, cmd: AdminCommand) -> Option<String> {
        let ctx = self.ctx();
        let reply = match cmd {
            AdminCommand::Help => self.help_text(),
            AdminCommand::Status => self.status_text(),
            AdminCommand::Reset => {
                ctx.reset_conversation();
                "Conversation history has been cleared.".to_string()
            }
            AdminCommand::Pause => {
                ctx.pause();
                "Bot-to-bot conversation paused.".to_string()
            }
            AdminCommand::Resume => {
                ctx.resume();
                "Bot-to-bot conversation resumed.".to_string()
            }
            AdminCommand::SwapModel { agent, model } => match ctx.find_agent(&agent) {
                Some(profile) => match ctx.swap_model(&profile.id, &model) {
                    Ok(()) => format!("{}'s model has been updated to `{}`.", profile.name, model),
                    Err(e) => e.to_string(),
                },
                None => not_found(&agent),
            },
            AdminCommand::SetPersonality { agent, personality } => match ctx.find_agent(&agent) {
                Some(profile) => match ctx.set_personality(&profile.id, &personality) {
                    Ok(()) => format!("{}'s personality has been updated.", profile.name),
                    Err(e) => e.to_string(),
                },
                None => not_found(&agent),
            },
            AdminCommand::SetTemperature { agent, temperature } => match ctx.find_agent(&agent) {
                Some(profile) => match ctx.set_temperature(&profile.id, temperature) {
                    Ok(()) => format!(
                        "{}'s temperature has been updated to `{}`.",
                        profile.name, temperature
                    ),
                    Err(e) => e.to_string(),
                },
                None => not_found(&agent),
            },
            AdminCommand::Ask { agent, prompt: question } => match ctx.find_agent(&agent) {
                Some(profile) => {
                    let messages = prompt::ask_prompt(&profile, &question);
                    self.dispatcher.dispatch(&profile.id, Some(messages));
                    return None;
                }
                None => format!(
                    "{} Available bots: {}",
                    not_found(&agent),
                    ctx.agents()
                        .iter()
                        .map(|a| a.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            },
            AdminCommand::Usage(usage) => usage.to_string(),
            AdminCommand::Unknown(name) => format!(
                "Unknown command: {}. Try {} help for available commands.",
                name, self.config.command_prefix
            ),
        };
        Some(reply)
    }

    fn help_text(&self) -> String {
        format!(
            "Available commands:\n\
            - help - Show this help\n\
            - status - Show each bot's model and temperature\n\
            - ask <bot> <question> - Ask one bot directly\n\
            - reset - [Admin] Clear the conversation history\n\
            - pause / resume - [Admin] Pause or resume the bot-to-bot conversation\n\
            - swap_model <bot> <model> - [Admin] Change a bot's model\n\
            - set_personality <bot> <text> - [Admin] Replace a bot's personality\n\
            - set_temperature <bot> <value> - [Admin] Change a bot's temperature\n\
            \n\
            Use {} <command> or !<command>. Start a message with !! to send it as plain text.",
            self.config.command_prefix
        )
    }

    fn status_text(&self) -> String {
        let ctx = self.ctx();
        let mut lines = vec!["Bot Status".to_string()];
        for status in ctx.agent_status() {
            lines.push(format!(
                "{} ({}): model {}, temperature {}",
                status.name, status.id, status.model, status.temperature
            ));
        }
        let (len, turns) = ctx.with_state(|s| (s.len(), s.turn_count()));
        lines.push(format!(
            "Conversation: {}, {} messages, turn {}",
            if ctx.is_paused() { "paused" } else { "active" },
            len,
            turns
        ));
        lines.join("\n")
    }

    /// Consume an event stream until it ends
    pub async fn run(&self, mut events: EventStream) {
        tracing::info!("Orchestrator listening for messages");
        while let Some(msg) = events.next().await {
            let event_id = msg.event_id.clone();
            match self.handle_message(msg).await {
                Ok(result) => tracing::debug!(event_id = %event_id, ?result, "Message handled"),
                Err(e) => {
                    tracing::error!(
                        event_id = %event_id,
                        error = %format!("{:#}", e),
                        "Failed to handle message"
                    )
                }
            }
        }
        tracing::info!("Event stream ended");
    }
}

fn not_found(agent: &str) -> String {
    format!("Bot '{}' not found.", agent)
}
