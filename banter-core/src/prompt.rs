// ABOUTME: Prompt construction from conversation history and response post-processing
// ABOUTME: Strips reasoning blocks, self-name prefixes, and inbound mention tokens

use crate::conversation::{Message, Speaker};
use crate::profile::AgentProfile;
use banter_agent::ChatMessage;
use regex::Regex;
use std::sync::LazyLock;

static REASONING_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("hardcoded regex"));

static MENTION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@!?\d+>").expect("hardcoded regex"));

/// System instruction used when the agent replies to the running conversation
pub fn system_instruction(profile: &AgentProfile) -> String {
    format!(
        "{}\n\nYou are {}. Respond naturally to the last message, keeping the full history in mind. Keep your response short.",
        profile.personality, profile.name
    )
}

/// Full message list for a conversational reply.
///
/// Every history entry becomes a `user` turn labelled with its speaker's
/// display name, so the model sees one transcript rather than a dialogue it
/// took part in.
pub fn build_prompt<F>(
    profile: &AgentProfile,
    history: &[Message],
    display_name: F,
) -> Vec<ChatMessage>
where
    F: Fn(&Speaker) -> String,
{
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(system_instruction(profile)));
    messages.extend(
        history
            .iter()
            .map(|m| ChatMessage::user(format!("{}: {}", display_name(&m.speaker), m.content))),
    );
    messages
}

/// Message list for a direct question to one agent
pub fn ask_prompt(profile: &AgentProfile, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!("{}\n\nYou are {}.", profile.personality, profile.name)),
        ChatMessage::user(question),
    ]
}

/// Remove `<think>...</think>` segments, across lines, non-greedy
pub fn strip_reasoning(text: &str) -> String {
    REASONING_BLOCK.replace_all(text, "").trim().to_string()
}

/// Remove any leading "Name:" the model echoed back, case-insensitive
pub fn strip_name_prefix(text: &str, name: &str) -> String {
    let mut rest = text.trim();
    if name.is_empty() {
        return rest.to_string();
    }
    let prefix_len = name.len() + 1;
    loop {
        let Some(head) = rest.get(..prefix_len) else {
            break;
        };
        if head.ends_with(':') && head[..name.len()].eq_ignore_ascii_case(name) {
            rest = rest[prefix_len..].trim_start();
        } else {
            break;
        }
    }
    rest.to_string()
}

/// Post-process raw model output. `None` means nothing is left to say.
pub fn clean_response(raw: &str, name: &str) -> Option<String> {
    let text = strip_name_prefix(&strip_reasoning(raw), name);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Remove `<@123>` / `<@!123>` mention tokens from inbound text
pub fn strip_mentions(text: &str) -> String {
    MENTION_TOKEN.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_agent::Role;
    use crate::conversation::ConversationState;

    fn profile() -> AgentProfile {
        AgentProfile::new("bot1", "MiniModGPT", "qwen:0.5b", "You are tiny.")
    }

    #[test]
    fn test_system_instruction_text() {
        assert_eq!(
            system_instruction(&profile()),
            "You are tiny.\n\nYou are MiniModGPT. Respond naturally to the last message, keeping the full history in mind. Keep your response short."
        );
    }

    #[test]
    fn test_build_prompt_labels_speakers() {
        let mut state = ConversationState::new(10);
        state.append(Speaker::User, "hello");
        state.append(Speaker::agent("bot1"), "hi there");
        state.append(Speaker::System, "keep going");

        let names = |s: &Speaker| match s.agent_id() {
            Some("bot1") => "MiniModGPT".to_string(),
            _ => "User".to_string(),
        };
        let messages = build_prompt(&profile(), &state.snapshot(), names);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "User: hello");
        assert_eq!(messages[2].content, "MiniModGPT: hi there");
        assert_eq!(messages[3].content, "User: keep going");
        assert!(messages[1..].iter().all(|m| m.role == Role::User));
    }

    #[test]
    fn test_ask_prompt_shape() {
        let messages = ask_prompt(&profile(), "What is Rust?");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "You are tiny.\n\nYou are MiniModGPT.");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "What is Rust?");
    }

    #[test]
    fn test_strip_reasoning_multiline_non_greedy() {
        let raw = "<think>\nplan\nmore</think>Hello <think>x</think>world";
        assert_eq!(strip_reasoning(raw), "Hello world");
    }

    #[test]
    fn test_strip_reasoning_unclosed_left_alone() {
        assert_eq!(strip_reasoning("<think>never closed"), "<think>never closed");
    }

    #[test]
    fn test_strip_name_prefix() {
        assert_eq!(strip_name_prefix("MiniModGPT: hi", "MiniModGPT"), "hi");
        assert_eq!(strip_name_prefix("minimodgpt:hi", "MiniModGPT"), "hi");
        assert_eq!(
            strip_name_prefix("MiniModGPT: MiniModGPT: hi", "MiniModGPT"),
            "hi"
        );
        assert_eq!(strip_name_prefix("SarcasticAI: hi", "MiniModGPT"), "SarcasticAI: hi");
        assert_eq!(strip_name_prefix("MiniModGPT says hi", "MiniModGPT"), "MiniModGPT says hi");
    }

    #[test]
    fn test_strip_name_prefix_multibyte_safe() {
        assert_eq!(strip_name_prefix("é", "MiniModGPT"), "é");
        assert_eq!(strip_name_prefix("ééééééééééé", "MiniModGPT"), "ééééééééééé");
    }

    #[test]
    fn test_clean_response_empty_after_stripping() {
        assert_eq!(clean_response("<think>only thoughts</think>", "MiniModGPT"), None);
        assert_eq!(clean_response("MiniModGPT:   ", "MiniModGPT"), None);
        assert_eq!(
            clean_response("<think>hmm</think>\nMiniModGPT: Sure thing", "MiniModGPT"),
            Some("Sure thing".to_string())
        );
    }

    #[test]
    fn test_strip_mentions() {
        assert_eq!(strip_mentions("<@123> hello <@!456>"), "hello");
        assert_eq!(strip_mentions("<@123>"), "");
        assert_eq!(strip_mentions("no mentions"), "no mentions");
    }
}
