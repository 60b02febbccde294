// ABOUTME: Per-agent response units: wait, generate under a deadline, post-process, send, append
// ABOUTME: Units are fire-and-forget on a tracked task set so callers never await them

use crate::context::ConversationContext;
use crate::conversation::Speaker;
use crate::metrics;
use crate::prompt;
use crate::traits::{AgentChannels, SharedChannel};
use anyhow::{Context, Result};
use banter_agent::{ChatMessage, GenerationRequest, SharedBackend};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Sent when generation misses its deadline
pub const FILLER_RESPONSE: &str = "I seem to have lost my train of thought...";

/// Sent when generation fails outright
pub const APOLOGY_RESPONSE: &str = "My apologies, I encountered an internal error.";

/// Typing indicators on most platforms expire after a few seconds
const TYPING_REFRESH: Duration = Duration::from_secs(4);

/// How one response unit ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Text was delivered and appended under the agent's id
    Sent(String),
    /// Nothing left after post-processing; nothing sent, nothing appended
    Empty,
}

/// Spawns and tracks response units for every agent
#[derive(Clone)]
pub struct ResponseDispatcher {
    ctx: Arc<ConversationContext>,
    backend: SharedBackend,
    channels: AgentChannels,
    tasks: TaskTracker,
}

impl ResponseDispatcher {
    pub fn new(
        ctx: Arc<ConversationContext>,
        backend: SharedBackend,
        channels: AgentChannels,
    ) -> Self {
        Self {
            ctx,
            backend,
            channels,
            tasks: TaskTracker::new(),
        }
    }

    pub fn context(&self) -> &Arc<ConversationContext> {
        &self.ctx
    }

    pub fn channels(&self) -> &AgentChannels {
        &self.channels
    }

    /// Start a response unit for `agent_id` and return immediately.
    ///
    /// With an override prompt the response delay is skipped and the given
    /// messages replace the history-derived prompt.
    pub fn dispatch(
        &self,
        agent_id: &str,
        override_prompt: Option<Vec<ChatMessage>>,
    ) -> JoinHandle<()> {
        metrics::record_dispatch(agent_id);
        tracing::debug!(
            agent = %agent_id,
            override_prompt = override_prompt.is_some(),
            "Dispatching response unit"
        );

        let this = self.clone();
        let agent_id = agent_id.to_string();
        self.tasks.spawn(async move {
            match this.respond(&agent_id, override_prompt).await {
                Ok(DispatchOutcome::Sent(text)) => {
                    tracing::info!(agent = %agent_id, len = text.len(), "Agent sent a message");
                }
                Ok(DispatchOutcome::Empty) => {
                    tracing::info!(
                        agent = %agent_id,
                        "Response empty after post-processing, nothing sent"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        agent = %agent_id,
                        error = %format!("{:#}", e),
                        "Response unit failed"
                    );
                }
            }
        })
    }

    /// Run one response unit to completion on the current task
    pub async fn respond(
        &self,
        agent_id: &str,
        override_prompt: Option<Vec<ChatMessage>>,
    ) -> Result<DispatchOutcome> {
        let profile = self
            .ctx
            .agent(agent_id)
            .with_context(|| format!("Unknown agent: {}", agent_id))?;
        let channel = self.channels.for_agent(agent_id).clone();

        if override_prompt.is_none() {
            let delay = profile.response_delay.sample(&mut rand::thread_rng());
            tokio::time::sleep(delay).await;
        }

        let typing = TypingScope::acquire(channel.clone())
            .await
            .context("Failed to start typing indicator")?;

        let messages = match override_prompt {
            Some(messages) => messages,
            None => {
                let history = self.ctx.history();
                prompt::build_prompt(&profile, &history, |s| self.ctx.display_name(s))
            }
        };

        let delay = profile.typing_delay.sample(&mut rand::thread_rng());
        tokio::time::sleep(delay).await;

        tracing::info!(agent = %agent_id, model = %profile.model, "Generating response");
        let request = GenerationRequest::new(profile.model.clone(), messages)
            .with_options(profile.generation_options());
        let deadline = self.ctx.settings().generation_timeout;

        let raw = match tokio::time::timeout(deadline, self.backend.generate(request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::error!(
                    agent = %agent_id,
                    error = %format!("{:#}", e),
                    "Generation failed"
                );
                metrics::record_fallback(agent_id, "error");
                APOLOGY_RESPONSE.to_string()
            }
            Err(_) => {
                tracing::warn!(
                    agent = %agent_id,
                    timeout_secs = deadline.as_secs(),
                    "Generation timed out"
                );
                metrics::record_fallback(agent_id, "timeout");
                FILLER_RESPONSE.to_string()
            }
        };

        typing.release().await;

        let Some(text) = prompt::clean_response(&raw, &profile.name) else {
            return Ok(DispatchOutcome::Empty);
        };

        if let Err(e) = channel.send(&text).await {
            metrics::record_send_failure(agent_id);
            return Err(e).context("Failed to send response");
        }
        metrics::record_message_sent(agent_id);

        self.ctx.append(Speaker::agent(agent_id), text.clone());
        Ok(DispatchOutcome::Sent(text))
    }

    /// Number of units still running
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every outstanding unit has finished.
    ///
    /// Units dispatched while draining are waited on too.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Give outstanding units `grace` to finish.
    /// Returns false if some were still running when it elapsed.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tasks.close();
        tokio::time::timeout(grace, self.tasks.wait()).await.is_ok()
    }
}

/// Typing signal held for the generation phase of one unit.
///
/// The indicator is refreshed in the background until `release` is called or
/// the scope is dropped.
struct TypingScope {
    channel: SharedChannel,
    refresher: Option<JoinHandle<()>>,
}

impl TypingScope {
    async fn acquire(channel: SharedChannel) -> Result<Self> {
        let Some(indicator) = channel.typing_indicator() else {
            return Ok(Self {
                channel,
                refresher: None,
            });
        };
        indicator.set_typing(true).await?;

        let refresh_channel = channel.clone();
        let refresher = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TYPING_REFRESH);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Some(indicator) = refresh_channel.typing_indicator() {
                    if let Err(e) = indicator.set_typing(true).await {
                        tracing::debug!(error = %e, "Typing refresh failed");
                    }
                }
            }
        });

        Ok(Self {
            channel,
            refresher: Some(refresher),
        })
    }

    async fn release(mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.abort();
            if let Some(indicator) = self.channel.typing_indicator() {
                if let Err(e) = indicator.set_typing(false).await {
                    tracing::debug!(error = %e, "Failed to clear typing indicator");
                }
            }
        }
    }
}

impl Drop for TypingScope {
    fn drop(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.abort();
        }
    }
}
