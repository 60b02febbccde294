// ABOUTME: Chat command parsing and the admin command vocabulary
// ABOUTME: Recognises "!banter <cmd>" and "!<cmd>" forms; "!!" escapes to plain text

/// A command split into name and arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Lowercased command name, without prefix
    pub name: String,
    /// Arguments, with quoted spans kept together
    pub args: Vec<String>,
    /// Everything after the command name, trimmed
    pub raw_args: String,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>, raw_args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args,
            raw_args: raw_args.into(),
        }
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|s| s.as_str())
    }

    /// Text after the first argument, for free-form trailing values
    pub fn rest_after_first(&self) -> Option<&str> {
        let first = self.args.first()?;
        let raw = self.raw_args.trim_start();
        let skip = if raw.starts_with('"') || raw.starts_with('\'') {
            first.len() + 2
        } else {
            first.len()
        };
        let rest = raw.get(skip..)?.trim();
        (!rest.is_empty()).then_some(rest)
    }
}

/// How an inbound body should be treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    Command(Command),
    Message(String),
    /// Empty after trimming or escaping
    Ignore,
}

/// Split on whitespace, keeping '...' and "..." spans as single arguments
fn parse_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => {
                quote = None;
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

fn split_command(text: &str) -> ParseResult {
    let text = text.trim();
    let (name, rest) = match text.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (text, ""),
    };
    ParseResult::Command(Command::new(name.to_lowercase(), parse_args(rest), rest))
}

/// Classify an inbound body.
///
/// `!!text` is plain text `text`. `{prefix} cmd ...` and `!cmd ...` are
/// commands when the name starts with a letter. Everything else is a message.
pub fn parse_message(body: &str, prefix: &str) -> ParseResult {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return ParseResult::Ignore;
    }

    if let Some(escaped) = trimmed.strip_prefix("!!") {
        let escaped = escaped.trim();
        return if escaped.is_empty() {
            ParseResult::Ignore
        } else {
            ParseResult::Message(escaped.to_string())
        };
    }

    if let Some(head) = trimmed.get(..prefix.len()) {
        let rest = &trimmed[prefix.len()..];
        if head.eq_ignore_ascii_case(prefix)
            && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            return split_command(rest);
        }
    }

    if let Some(after_bang) = trimmed.strip_prefix('!') {
        if after_bang.starts_with(char::is_alphabetic) {
            return split_command(after_bang);
        }
    }

    ParseResult::Message(trimmed.to_string())
}

/// Commands understood by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    Help,
    Status,
    Reset,
    Pause,
    Resume,
    SwapModel { agent: String, model: String },
    SetPersonality { agent: String, personality: String },
    SetTemperature { agent: String, temperature: f32 },
    Ask { agent: String, prompt: String },
    /// Recognised name, malformed arguments
    Usage(&'static str),
    Unknown(String),
}

impl AdminCommand {
    /// Whether only configured admins may run this
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::Reset
                | Self::Pause
                | Self::Resume
                | Self::SwapModel { .. }
                | Self::SetPersonality { .. }
                | Self::SetTemperature { .. }
        )
    }
}

pub const SWAP_MODEL_USAGE: &str = "Usage: swap_model <agent> <model>";
pub const SET_PERSONALITY_USAGE: &str = "Usage: set_personality <agent> <personality text>";
pub const SET_TEMPERATURE_USAGE: &str = "Usage: set_temperature <agent> <temperature>";
pub const ASK_USAGE: &str = "Usage: ask <agent> <question>";

impl Command {
    pub fn as_admin(&self) -> AdminCommand {
        match self.name.as_str() {
            "" | "help" | "h" => AdminCommand::Help,
            "status" | "bot_status" => AdminCommand::Status,
            "reset" | "reset_chat" => AdminCommand::Reset,
            "pause" | "pause_chat" => AdminCommand::Pause,
            "resume" | "resume_chat" => AdminCommand::Resume,
            "swap_model" => match (self.arg(0), self.arg(1)) {
                (Some(agent), Some(model)) => AdminCommand::SwapModel {
                    agent: agent.to_string(),
                    model: model.to_string(),
                },
                _ => AdminCommand::Usage(SWAP_MODEL_USAGE),
            },
            "set_personality" => match (self.arg(0), self.rest_after_first()) {
                (Some(agent), Some(text)) => AdminCommand::SetPersonality {
                    agent: agent.to_string(),
                    personality: text.to_string(),
                },
                _ => AdminCommand::Usage(SET_PERSONALITY_USAGE),
            },
            "set_temperature" => {
                let temperature = self.arg(1).and_then(|t| t.parse::<f32>().ok());
                match (self.arg(0), temperature) {
                    (Some(agent), Some(temperature)) => AdminCommand::SetTemperature {
                        agent: agent.to_string(),
                        temperature,
                    },
                    _ => AdminCommand::Usage(SET_TEMPERATURE_USAGE),
                }
            }
            "ask" => match (self.arg(0), self.rest_after_first()) {
                (Some(agent), Some(prompt)) => AdminCommand::Ask {
                    agent: agent.to_string(),
                    prompt: prompt.to_string(),
                },
                _ => AdminCommand::Usage(ASK_USAGE),
            },
            other => AdminCommand::Unknown(other.to_string()),
        }
    }
}
