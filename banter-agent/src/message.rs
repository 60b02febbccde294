// ABOUTME: Request types passed to generation backends.
// ABOUTME: Role-tagged chat turns plus sampling options (temperature, output token cap).

use serde::{Deserialize, Serialize};

/// Role of a single turn in a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    /// Only produced by models, never sent
    Assistant,
}

/// One role-tagged turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling options forwarded to the model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 256,
        }
    }
}

/// A complete generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier understood by the backend (e.g. "gemma:2b")
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Content of the final turn, if any
    pub fn last_content(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::system("hi")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"hi"}"#);
    }

    #[test]
    fn test_request_last_content() {
        let req = GenerationRequest::new(
            "qwen:0.5b",
            vec![ChatMessage::system("persona"), ChatMessage::user("User: hello")],
        );
        assert_eq!(req.last_content(), Some("User: hello"));

        let empty = GenerationRequest::new("qwen:0.5b", vec![]);
        assert_eq!(empty.last_content(), None);
    }

    #[test]
    fn test_with_options_overrides_defaults() {
        let req = GenerationRequest::new("m", vec![]).with_options(GenerationOptions {
            temperature: 1.6,
            max_output_tokens: 169,
        });
        assert_eq!(req.options.max_output_tokens, 169);
        assert!((req.options.temperature - 1.6).abs() < f32::EPSILON);
    }
}
