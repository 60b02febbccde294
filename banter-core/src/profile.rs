// ABOUTME: Per-agent profile: persona, model parameters, response chance, and delays
// ABOUTME: Base profiles merge with optional overrides once, at construction

use banter_agent::GenerationOptions;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest delay a profile may ask for
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Inclusive range of seconds, written as `[min, max]` in config
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const ZERO: Self = Self::fixed(0.0);

    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub const fn fixed(secs: f64) -> Self {
        Self::new(secs, secs)
    }

    pub fn is_valid(&self) -> bool {
        self.min_secs.is_finite()
            && self.max_secs.is_finite()
            && self.min_secs >= 0.0
            && self.min_secs <= self.max_secs
            && self.max_secs <= MAX_DELAY_SECS
    }

    /// Draw a delay uniformly from the range
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let secs = if self.max_secs > self.min_secs {
            rng.gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        };
        Duration::try_from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS)).unwrap_or(Duration::ZERO)
    }
}

impl From<(f64, f64)> for DelayRange {
    fn from((min_secs, max_secs): (f64, f64)) -> Self {
        Self { min_secs, max_secs }
    }
}

impl From<DelayRange> for (f64, f64) {
    fn from(range: DelayRange) -> Self {
        (range.min_secs, range.max_secs)
    }
}

/// Resolved configuration for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Stable identifier, used as the speaker tag in history
    pub id: String,
    /// Display name shown in prompts and used for command lookup
    pub name: String,
    pub model: String,
    pub personality: String,
    /// Probability in [0, 1] of answering an eligible trigger
    #[serde(default = "default_response_chance")]
    pub response_chance: f64,
    /// Thinking pause before typing starts
    #[serde(default = "default_response_delay")]
    pub response_delay: DelayRange,
    /// Pause while the typing indicator is shown
    #[serde(default = "default_typing_delay")]
    pub typing_delay: DelayRange,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_response_chance() -> f64 {
    1.0
}

fn default_response_delay() -> DelayRange {
    DelayRange::new(1.0, 3.0)
}

fn default_typing_delay() -> DelayRange {
    DelayRange::new(0.5, 1.5)
}

fn default_max_tokens() -> u32 {
    256
}

fn default_temperature() -> f32 {
    0.7
}

/// Partial profile layered over a base profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverride {
    pub name: Option<String>,
    pub model: Option<String>,
    pub personality: Option<String>,
    pub response_chance: Option<f64>,
    pub response_delay: Option<DelayRange>,
    pub typing_delay: Option<DelayRange>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl AgentProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        model: impl Into<String>,
        personality: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            model: model.into(),
            personality: personality.into(),
            response_chance: default_response_chance(),
            response_delay: default_response_delay(),
            typing_delay: default_typing_delay(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    /// Zero delays; handy for tests and the console transport
    pub fn without_delays(mut self) -> Self {
        self.response_delay = DelayRange::ZERO;
        self.typing_delay = DelayRange::ZERO;
        self
    }

    pub fn with_response_chance(mut self, chance: f64) -> Self {
        self.response_chance = chance;
        self
    }

    /// Apply an override; fields the override leaves unset keep the base value
    pub fn resolve(mut self, overlay: Option<&ProfileOverride>) -> Self {
        let Some(o) = overlay else {
            return self;
        };
        if let Some(ref name) = o.name {
            self.name = name.clone();
        }
        if let Some(ref model) = o.model {
            self.model = model.clone();
        }
        if let Some(ref personality) = o.personality {
            self.personality = personality.clone();
        }
        if let Some(chance) = o.response_chance {
            self.response_chance = chance;
        }
        if let Some(range) = o.response_delay {
            self.response_delay = range;
        }
        if let Some(range) = o.typing_delay {
            self.typing_delay = range;
        }
        if let Some(max_tokens) = o.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = o.temperature {
            self.temperature = temperature;
        }
        self
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_output_tokens: self.max_tokens,
        }
    }

    /// Roll the response chance
    pub fn wants_to_respond<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen::<f64>() <= self.response_chance
    }

    /// Case-insensitive match on display name or id
    pub fn matches_name(&self, query: &str) -> bool {
        self.name.eq_ignore_ascii_case(query) || self.id.eq_ignore_ascii_case(query)
    }
}

/// The two personas the bot shipped with
pub fn default_agents() -> Vec<AgentProfile> {
    let mut formal = AgentProfile::new(
        "bot1",
        "MiniModGPT",
        "qwen:0.5b",
        "You are a curious, respectful, and formal AI assistant.",
    );
    formal.typing_delay = DelayRange::new(0.5, 1.5);
    formal.response_delay = DelayRange::new(1.0, 3.0);
    formal.max_tokens = 269;
    formal.temperature = 0.7;

    let mut sarcastic = AgentProfile::new(
        "bot2",
        "SarcasticAI",
        "gemma:2b",
        "You are a sarcastic, witty AI that makes snarky remarks.",
    );
    sarcastic.typing_delay = DelayRange::new(0.3, 1.2);
    sarcastic.response_delay = DelayRange::new(0.5, 2.5);
    sarcastic.max_tokens = 169;
    sarcastic.temperature = 1.6;

    vec![formal, sarcastic]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_delay_range_sample_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let range = DelayRange::new(0.5, 2.5);
        for _ in 0..200 {
            let d = range.sample(&mut rng).as_secs_f64();
            assert!((0.5..=2.5).contains(&d), "sampled {}", d);
        }
    }

    #[test]
    fn test_delay_range_degenerate() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(DelayRange::fixed(1.0).sample(&mut rng), Duration::from_secs(1));
        assert_eq!(DelayRange::ZERO.sample(&mut rng), Duration::ZERO);
        // Inverted ranges fall back to the lower bound instead of panicking
        assert_eq!(DelayRange::new(2.0, 1.0).sample(&mut rng), Duration::from_secs(2));
    }

    #[test]
    fn test_delay_range_validity() {
        assert!(DelayRange::new(0.0, 1.0).is_valid());
        assert!(!DelayRange::new(2.0, 1.0).is_valid());
        assert!(!DelayRange::new(-1.0, 1.0).is_valid());
        assert!(!DelayRange::new(0.0, f64::NAN).is_valid());
        assert!(DelayRange::fixed(MAX_DELAY_SECS).is_valid());
        assert!(!DelayRange::new(0.0, MAX_DELAY_SECS + 1.0).is_valid());
    }

    #[test]
    fn test_delay_range_sample_never_panics_on_huge_values() {
        let mut rng = StdRng::seed_from_u64(3);
        let huge = DelayRange::fixed(1e20);
        assert_eq!(huge.sample(&mut rng), Duration::from_secs_f64(MAX_DELAY_SECS));
        assert_eq!(DelayRange::fixed(f64::NAN).sample(&mut rng), Duration::ZERO);
    }

    #[test]
    fn test_delay_range_from_toml_array() {
        #[derive(Deserialize)]
        struct Holder {
            delay: DelayRange,
        }
        let holder: Holder = toml::from_str("delay = [0.3, 1.2]").unwrap();
        assert_eq!(holder.delay, DelayRange::new(0.3, 1.2));
    }

    #[test]
    fn test_resolve_without_override_is_identity() {
        let base = default_agents().remove(0);
        assert_eq!(base.clone().resolve(None), base);
    }

    #[test]
    fn test_resolve_applies_only_set_fields() {
        let base = default_agents().remove(1);
        let overlay = ProfileOverride {
            model: Some("llama3:8b".to_string()),
            temperature: Some(0.9),
            ..ProfileOverride::default()
        };
        let resolved = base.clone().resolve(Some(&overlay));
        assert_eq!(resolved.model, "llama3:8b");
        assert!((resolved.temperature - 0.9).abs() < f32::EPSILON);
        assert_eq!(resolved.name, base.name);
        assert_eq!(resolved.personality, base.personality);
        assert_eq!(resolved.max_tokens, 169);
    }

    #[test]
    fn test_wants_to_respond_extremes() {
        let mut rng = StdRng::seed_from_u64(42);
        let always = AgentProfile::new("a", "A", "m", "p").with_response_chance(1.0);
        let never = AgentProfile::new("b", "B", "m", "p").with_response_chance(0.0);
        for _ in 0..100 {
            assert!(always.wants_to_respond(&mut rng));
        }
        // gen::<f64>() can return exactly 0.0 in theory; over 100 draws it won't
        assert!((0..100).filter(|_| never.wants_to_respond(&mut rng)).count() == 0);
    }

    #[test]
    fn test_matches_name_case_insensitive() {
        let agent = default_agents().remove(1);
        assert!(agent.matches_name("sarcasticai"));
        assert!(agent.matches_name("BOT2"));
        assert!(!agent.matches_name("MiniModGPT"));
    }

    #[test]
    fn test_generation_options_from_profile() {
        let agent = default_agents().remove(0);
        let opts = agent.generation_options();
        assert_eq!(opts.max_output_tokens, 269);
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
    }
}
