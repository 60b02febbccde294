// ABOUTME: Process-scoped context shared by every scheduler component
// ABOUTME: Owns conversation state, agent profiles, the pause flag, and timing settings

use crate::conversation::{ConversationState, Message, Speaker};
use crate::profile::AgentProfile;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Duration;

/// Label used in prompts for the user and system speaker classes
pub const HUMAN_LABEL: &str = "User";

pub const DEFAULT_ROAST_PROMPT: &str = "The human user has been silent for far too long. Briefly roast them for their absence, then ask a question to get the conversation moving again.";

pub const DEFAULT_CONTINUATION_PROMPT: &str =
    "The conversation has stalled. Say something interesting to continue it.";

/// Scheduler thresholds and stimulus texts
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Maximum messages kept in history
    pub history_capacity: usize,
    /// Silence from the user before a roast
    pub user_inactivity: Duration,
    /// Silence from everyone before a continuation stimulus
    pub stall_after: Duration,
    /// Watchdog period
    pub tick_interval: Duration,
    /// Hard deadline on a single generation call
    pub generation_timeout: Duration,
    pub roast_prompt: String,
    pub continuation_prompt: String,
    /// Agent that answers roast stimuli
    pub roast_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_capacity: 30,
            user_inactivity: Duration::from_secs(480),
            stall_after: Duration::from_secs(45),
            tick_interval: Duration::from_secs(15),
            generation_timeout: Duration::from_secs(45),
            roast_prompt: DEFAULT_ROAST_PROMPT.to_string(),
            continuation_prompt: DEFAULT_CONTINUATION_PROMPT.to_string(),
            roast_agent: Some("bot2".to_string()),
        }
    }
}

/// Status line for one agent, as reported to admins
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStatus {
    pub id: String,
    pub name: String,
    pub model: String,
    pub temperature: f32,
}

/// Everything the scheduler shares, constructed once and passed around in an `Arc`.
///
/// Locks are held only inside these methods and never across an `.await`, so
/// each append or reset is a single indivisible step from the point of view
/// of concurrently running dispatch units.
#[derive(Debug)]
pub struct ConversationContext {
    state: Mutex<ConversationState>,
    agents: RwLock<Vec<AgentProfile>>,
    paused: AtomicBool,
    settings: Settings,
}

impl ConversationContext {
    pub fn new(settings: Settings, agents: Vec<AgentProfile>) -> Self {
        Self {
            state: Mutex::new(ConversationState::new(settings.history_capacity)),
            agents: RwLock::new(agents),
            paused: AtomicBool::new(false),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // Conversation state
    // ------------------------------------------------------------------

    pub fn append(&self, speaker: Speaker, content: impl Into<String>) {
        self.state().append(speaker, content);
    }

    pub fn eligible(&self, agent_id: &str) -> bool {
        self.state().eligible(agent_id)
    }

    /// Run a read-only closure against the state
    pub fn with_state<R>(&self, f: impl FnOnce(&ConversationState) -> R) -> R {
        f(&self.state())
    }

    pub fn history(&self) -> Vec<Message> {
        self.state().snapshot()
    }

    pub fn turn_count(&self) -> u32 {
        self.state().turn_count()
    }

    pub fn last_speaker(&self) -> Option<Speaker> {
        self.state().last_speaker().cloned()
    }

    pub fn reset_conversation(&self) {
        self.state().reset();
    }

    // ------------------------------------------------------------------
    // Pause flag
    // ------------------------------------------------------------------

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        tracing::info!("Agent conversation paused");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        tracing::info!("Agent conversation resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Agent profiles
    // ------------------------------------------------------------------

    /// Current profiles, in configuration order
    pub fn agents(&self) -> Vec<AgentProfile> {
        self.agents.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|a| a.id.clone())
            .collect()
    }

    pub fn agent(&self, id: &str) -> Option<AgentProfile> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    /// Look an agent up by display name or id, ignoring case
    pub fn find_agent(&self, query: &str) -> Option<AgentProfile> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|a| a.matches_name(query))
            .cloned()
    }

    /// Name shown for a speaker in prompts
    pub fn display_name(&self, speaker: &Speaker) -> String {
        speaker
            .agent_id()
            .and_then(|id| self.agent(id))
            .map(|a| a.name)
            .unwrap_or_else(|| HUMAN_LABEL.to_string())
    }

    pub fn agent_status(&self) -> Vec<AgentStatus> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|a| AgentStatus {
                id: a.id.clone(),
                name: a.name.clone(),
                model: a.model.clone(),
                temperature: a.temperature,
            })
            .collect()
    }

    fn update_agent(&self, id: &str, update: impl FnOnce(&mut AgentProfile)) -> Result<()> {
        let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
        let agent = agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| anyhow::anyhow!("Unknown agent: {}", id))?;
        update(agent);
        Ok(())
    }

    pub fn swap_model(&self, id: &str, model: &str) -> Result<()> {
        self.update_agent(id, |a| a.model = model.to_string())?;
        tracing::info!(agent = %id, model = %model, "Agent model updated");
        Ok(())
    }

    pub fn set_personality(&self, id: &str, personality: &str) -> Result<()> {
        self.update_agent(id, |a| a.personality = personality.to_string())?;
        tracing::info!(agent = %id, "Agent personality updated");
        Ok(())
    }

    pub fn set_temperature(&self, id: &str, temperature: f32) -> Result<()> {
        if !temperature.is_finite() || temperature < 0.0 {
            anyhow::bail!("Temperature must be a non-negative number, got {}", temperature);
        }
        self.update_agent(id, |a| a.temperature = temperature)?;
        tracing::info!(agent = %id, temperature, "Agent temperature updated");
        Ok(())
    }
}
