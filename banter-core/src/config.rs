// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates agents, thresholds, and transport credentials before anything starts

use crate::context::{Settings, DEFAULT_CONTINUATION_PROMPT, DEFAULT_ROAST_PROMPT};
use crate::profile::{default_agents, AgentProfile, ProfileOverride, MAX_DELAY_SECS};
use anyhow::{Context, Result};
use banter_agent::config::BackendConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
    /// Empty means the two built-in agents
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    /// Partial profiles keyed by agent id
    #[serde(default)]
    pub overrides: HashMap<String, ProfileOverride>,
    /// Prometheus endpoint; without it counters are recorded but not exported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Socket address such as "127.0.0.1:9898"
    pub listen: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_user_inactivity_secs")]
    pub user_inactivity_secs: u64,
    #[serde(default = "default_stall_secs")]
    pub stall_secs: u64,
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_roast_prompt")]
    pub roast_prompt: String,
    #[serde(default = "default_continuation_prompt")]
    pub continuation_prompt: String,
    /// Agent that answers roast stimuli; empty disables roasting
    #[serde(default = "default_roast_agent")]
    pub roast_agent: String,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Sender ids allowed to run admin commands
    #[serde(default)]
    pub admin_users: Vec<String>,
}

fn default_history_capacity() -> usize {
    30
}

fn default_user_inactivity_secs() -> u64 {
    480
}

fn default_stall_secs() -> u64 {
    45
}

fn default_tick_secs() -> u64 {
    15
}

fn default_generation_timeout_secs() -> u64 {
    45
}

fn default_roast_prompt() -> String {
    DEFAULT_ROAST_PROMPT.to_string()
}

fn default_continuation_prompt() -> String {
    DEFAULT_CONTINUATION_PROMPT.to_string()
}

fn default_roast_agent() -> String {
    "bot2".to_string()
}

fn default_command_prefix() -> String {
    "!banter".to_string()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            user_inactivity_secs: default_user_inactivity_secs(),
            stall_secs: default_stall_secs(),
            tick_secs: default_tick_secs(),
            generation_timeout_secs: default_generation_timeout_secs(),
            roast_prompt: default_roast_prompt(),
            continuation_prompt: default_continuation_prompt(),
            roast_agent: default_roast_agent(),
            command_prefix: default_command_prefix(),
            admin_users: Vec::new(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// The one chat the agents talk in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
}

// Custom Debug impl to redact bot_token
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// One `[[agents]]` entry
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(flatten)]
    pub profile: AgentProfile,
    /// Agent speaks through its own bot account when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("profile", &self.profile)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl From<AgentProfile> for AgentConfig {
    fn from(profile: AgentProfile) -> Self {
        Self {
            profile,
            bot_token: None,
        }
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Find the config file: BANTER_CONFIG_PATH, then ./config.toml
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("BANTER_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("config.toml");
        local_config.exists().then_some(local_config)
    }

    /// Parse a config document without applying overrides or validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load configuration with environment variable overrides, then validate.
    ///
    /// An explicit path must exist; otherwise the usual locations are searched
    /// and built-in defaults are used when nothing is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading configuration from file");
                Self::from_file(path)?
            }
            None => match Self::find_config_file() {
                Some(found) => {
                    tracing::info!(path = %found.display(), "Loading configuration from file");
                    Self::from_file(&found)?
                }
                None => {
                    tracing::info!(
                        "No config file found, using environment variables and defaults"
                    );
                    Config::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.get_or_insert_with(Default::default).bot_token = Some(val);
        }
        if let Some(val) = lookup("TELEGRAM_CHAT_ID") {
            let chat_id = val
                .trim()
                .parse::<i64>()
                .with_context(|| {
                    format!("TELEGRAM_CHAT_ID must be a valid chat id, got: {}", val)
                })?;
            self.telegram.get_or_insert_with(Default::default).chat_id = Some(chat_id);
        }
        if let Some(val) = lookup("OLLAMA_HOST") {
            self.backend.set("host", val);
        }
        if let Some(val) = lookup("BANTER_BACKEND") {
            self.backend.backend_type = val;
        }
        if let Some(val) = lookup("BANTER_ADMIN_USERS") {
            self.conversation.admin_users = split_list(&val);
        }
        if let Some(val) = lookup("BANTER_METRICS_LISTEN") {
            self.metrics = Some(MetricsConfig { listen: val });
        }
        Ok(())
    }

    /// Configured agents, or the built-in pair when none are configured
    pub fn agent_configs(&self) -> Vec<AgentConfig> {
        if self.agents.is_empty() {
            default_agents().into_iter().map(AgentConfig::from).collect()
        } else {
            self.agents.clone()
        }
    }

    /// Agent profiles with overrides merged in, in configuration order
    pub fn resolved_agents(&self) -> Vec<AgentProfile> {
        self.agent_configs()
            .into_iter()
            .map(|a| {
                let overlay = self.overrides.get(&a.profile.id);
                a.profile.resolve(overlay)
            })
            .collect()
    }

    pub fn settings(&self) -> Settings {
        let c = &self.conversation;
        let roast_agent = c.roast_agent.trim();
        Settings {
            history_capacity: c.history_capacity,
            user_inactivity: Duration::from_secs(c.user_inactivity_secs),
            stall_after: Duration::from_secs(c.stall_secs),
            tick_interval: Duration::from_secs(c.tick_secs),
            generation_timeout: Duration::from_secs(c.generation_timeout_secs),
            roast_prompt: c.roast_prompt.clone(),
            continuation_prompt: c.continuation_prompt.clone(),
            roast_agent: (!roast_agent.is_empty()).then(|| roast_agent.to_string()),
        }
    }

    /// Telegram section, checked for the credentials the transport needs
    pub fn telegram_config(&self) -> Result<(&str, i64)> {
        let telegram = self
            .telegram
            .as_ref()
            .context("telegram section is required (set [telegram] or TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID)")?;
        let token = telegram
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .context("telegram.bot_token is required (set in config.toml or TELEGRAM_BOT_TOKEN env var)")?;
        let chat_id = telegram
            .chat_id
            .context("telegram.chat_id is required (set in config.toml or TELEGRAM_CHAT_ID env var)")?;
        Ok((token, chat_id))
    }

    /// Address for the Prometheus endpoint, if one is configured
    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>> {
        self.metrics
            .as_ref()
            .map(|m| {
                m.listen.trim().parse::<SocketAddr>().with_context(|| {
                    format!("metrics.listen must be a socket address, got: {}", m.listen)
                })
            })
            .transpose()
    }

    /// Check everything that does not depend on which transport runs
    pub fn validate(&self) -> Result<()> {
        let c = &self.conversation;
        if c.history_capacity == 0 {
            anyhow::bail!("conversation.history_capacity must be at least 1");
        }
        if c.tick_secs == 0 {
            anyhow::bail!("conversation.tick_secs must be greater than 0");
        }
        if c.generation_timeout_secs == 0 {
            anyhow::bail!("conversation.generation_timeout_secs must be greater than 0");
        }
        if c.command_prefix.trim().is_empty() {
            anyhow::bail!("conversation.command_prefix must not be empty");
        }

        let agents = self.resolved_agents();
        if agents.is_empty() {
            anyhow::bail!("At least one agent must be configured");
        }

        let mut seen = HashSet::new();
        for agent in &agents {
            if agent.id.trim().is_empty() {
                anyhow::bail!("Agent ids must not be empty");
            }
            if !seen.insert(agent.id.as_str()) {
                anyhow::bail!("Duplicate agent id '{}'", agent.id);
            }
            if agent.name.trim().is_empty() {
                anyhow::bail!("Agent '{}' needs a name", agent.id);
            }
            if agent.model.trim().is_empty() {
                anyhow::bail!("Agent '{}' needs a model", agent.id);
            }
            if !(0.0..=1.0).contains(&agent.response_chance) {
                anyhow::bail!(
                    "Agent '{}' response_chance must be between 0 and 1, got {}",
                    agent.id,
                    agent.response_chance
                );
            }
            if !agent.response_delay.is_valid() {
                anyhow::bail!(
                    "Agent '{}' response_delay must be [min, max] with 0 <= min <= max <= {}",
                    agent.id,
                    MAX_DELAY_SECS
                );
            }
            if !agent.typing_delay.is_valid() {
                anyhow::bail!(
                    "Agent '{}' typing_delay must be [min, max] with 0 <= min <= max <= {}",
                    agent.id,
                    MAX_DELAY_SECS
                );
            }
            if !agent.temperature.is_finite() || agent.temperature < 0.0 {
                anyhow::bail!("Agent '{}' temperature must be a non-negative number", agent.id);
            }
        }

        for id in self.overrides.keys() {
            if !seen.contains(id.as_str()) {
                anyhow::bail!("Override for unknown agent '{}'", id);
            }
        }

        if let Some(roast_agent) = self.settings().roast_agent {
            if !seen.contains(roast_agent.as_str()) {
                anyhow::bail!(
                    "conversation.roast_agent '{}' is not a configured agent",
                    roast_agent
                );
            }
        }

        if self.telegram.is_some() {
            self.telegram_config()?;
        }
        self.metrics_addr()?;

        Ok(())
    }

    /// Agent ids with their own bot token
    pub fn agent_tokens(&self) -> Vec<(String, String)> {
        self.agent_configs()
            .into_iter()
            .filter_map(|a| a.bot_token.map(|t| (a.profile.id, t)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.conversation, ConversationConfig::default());
        assert_eq!(config.backend.backend_type(), "ollama");
        assert!(config.telegram.is_none());

        let agents = config.resolved_agents();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].name, "MiniModGPT");
        assert_eq!(agents[1].name, "SarcasticAI");
        config.validate().unwrap();
    }

    #[test]
    fn test_settings_from_conversation_section() {
        let config = Config::from_toml_str(
            r#"
[conversation]
history_capacity = 5
user_inactivity_secs = 60
stall_secs = 10
tick_secs = 2
generation_timeout_secs = 20
roast_agent = ""
"#,
        )
        .unwrap();
        let settings = config.settings();
        assert_eq!(settings.history_capacity, 5);
        assert_eq!(settings.user_inactivity, Duration::from_secs(60));
        assert_eq!(settings.stall_after, Duration::from_secs(10));
        assert_eq!(settings.tick_interval, Duration::from_secs(2));
        assert_eq!(settings.generation_timeout, Duration::from_secs(20));
        assert!(settings.roast_agent.is_none());
    }

    #[test]
    fn test_agents_and_overrides() {
        let config = Config::from_toml_str(
            r#"
[conversation]
roast_agent = "grump"

[[agents]]
id = "grump"
name = "Grumpy"
model = "llama3:8b"
personality = "You complain."
response_chance = 0.5
response_delay = [0.0, 1.0]
bot_token = "123:abc"

[[agents]]
id = "sunny"
name = "Sunny"
model = "qwen:0.5b"
personality = "You are cheerful."

[overrides.sunny]
temperature = 1.2
name = "Sunshine"
"#,
        )
        .unwrap();
        config.validate().unwrap();

        let agents = config.resolved_agents();
        assert_eq!(agents[0].id, "grump");
        assert_eq!(agents[0].response_chance, 0.5);
        assert_eq!(agents[0].response_delay.max_secs, 1.0);
        assert_eq!(agents[1].name, "Sunshine");
        assert!((agents[1].temperature - 1.2).abs() < f32::EPSILON);
        assert_eq!(config.agent_tokens(), vec![("grump".to_string(), "123:abc".to_string())]);
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            ("[conversation]\nhistory_capacity = 0", "history_capacity"),
            ("[conversation]\nroast_agent = \"nobody\"", "roast_agent"),
            ("[overrides.ghost]\nmodel = \"x\"", "unknown agent"),
            (
                "[[agents]]\nid = \"a\"\nname = \"A\"\nmodel = \"m\"\npersonality = \"p\"\n\
                 [[agents]]\nid = \"a\"\nname = \"B\"\nmodel = \"m\"\npersonality = \"p\"\n\
                 [conversation]\nroast_agent = \"\"",
                "Duplicate agent id",
            ),
            (
                "[conversation]\nroast_agent = \"\"\n[[agents]]\nid = \"a\"\nname = \"A\"\nmodel = \"m\"\npersonality = \"p\"\nresponse_chance = 1.5",
                "response_chance",
            ),
            (
                "[conversation]\nroast_agent = \"\"\n[[agents]]\nid = \"a\"\nname = \"A\"\nmodel = \"m\"\npersonality = \"p\"\ntyping_delay = [2.0, 1.0]",
                "typing_delay",
            ),
            (
                "[conversation]\nroast_agent = \"\"\n[[agents]]\nid = \"a\"\nname = \"A\"\nmodel = \"m\"\npersonality = \"p\"\nresponse_delay = [1e20, 1e20]",
                "response_delay",
            ),
            ("[overrides.bot1]\ntyping_delay = [0.0, 7200.0]", "typing_delay"),
            ("[telegram]\nchat_id = 5", "bot_token"),
            ("[metrics]\nlisten = \"localhost\"", "metrics.listen"),
        ];
        for (toml, expected) in cases {
            let config = Config::from_toml_str(toml).unwrap();
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains(expected), "{:?} -> {}", toml, err);
        }
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                "TELEGRAM_BOT_TOKEN" => Some("999:xyz".to_string()),
                "TELEGRAM_CHAT_ID" => Some("-100123".to_string()),
                "OLLAMA_HOST" => Some("http://gpu:11434".to_string()),
                "BANTER_ADMIN_USERS" => Some("42, 43,".to_string()),
                "BANTER_BACKEND" => Some("mock".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.telegram_config().unwrap(), ("999:xyz", -100123));
        assert_eq!(config.backend.get_str("host"), Some("http://gpu:11434"));
        assert_eq!(config.backend.backend_type(), "mock");
        assert_eq!(config.conversation.admin_users, vec!["42", "43"]);
    }

    #[test]
    fn test_metrics_endpoint() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.metrics_addr().unwrap().is_none());

        let config = Config::from_toml_str("[metrics]\nlisten = \"127.0.0.1:9898\"").unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.metrics_addr().unwrap(),
            Some("127.0.0.1:9898".parse().unwrap())
        );

        let mut config = Config::default();
        config
            .apply_overrides(|key| (key == "BANTER_METRICS_LISTEN").then(|| "0.0.0.0:9100".into()))
            .unwrap();
        assert_eq!(config.metrics_addr().unwrap().unwrap().port(), 9100);
    }

    #[test]
    fn test_bad_chat_id_env() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == "TELEGRAM_CHAT_ID").then(|| "general".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_CHAT_ID"));
    }

    #[test]
    fn test_no_overrides_leaves_config_alone() {
        let mut config = Config::default();
        config.apply_overrides(no_env).unwrap();
        assert!(config.telegram.is_none());
        assert!(config.backend.get_str("host").is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let config = Config::from_toml_str(
            "[telegram]\nbot_token = \"secret-token\"\nchat_id = 1\n\
             [[agents]]\nid = \"a\"\nname = \"A\"\nmodel = \"m\"\npersonality = \"p\"\nbot_token = \"agent-secret\"",
        )
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-token"));
        assert!(!debug.contains("agent-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banter.toml");
        std::fs::write(&path, "[conversation]\nstall_secs = 90\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.conversation.stall_secs, 90);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
