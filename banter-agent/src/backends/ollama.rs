// ABOUTME: Ollama backend - posts non-streaming chat requests to /api/chat.
// ABOUTME: Forwards temperature and num_predict options, returns the assistant message text.

use crate::message::{ChatMessage, GenerationRequest};
use crate::traits::{GenerationBackend, SharedBackend};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HOST: &str = "http://localhost:11434";

/// Connect timeout for the HTTP client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the Ollama backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_host")]
    pub host: String,
    /// Client-side ceiling for a single request; the dispatcher's deadline is normally shorter
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

pub struct OllamaBackend {
    client: reqwest::Client,
    chat_url: String,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let host = config.host.trim().trim_end_matches('/');
        if host.is_empty() {
            anyhow::bail!("ollama backend requires a non-empty 'host'");
        }
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            chat_url: format!("{}/api/chat", host),
        })
    }

    /// Endpoint this backend posts to
    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::BackendFactory {
        Box::new(|config| {
            let cfg: OllamaConfig = serde_json::from_value(config.clone())
                .context("Invalid ollama backend config")?;
            let backend: SharedBackend = Arc::new(OllamaBackend::new(cfg)?);
            Ok(backend)
        })
    }
}

fn request_body(request: &GenerationRequest) -> ChatRequest<'_> {
    ChatRequest {
        model: &request.model,
        messages: &request.messages,
        stream: false,
        options: ChatOptions {
            temperature: request.options.temperature,
            num_predict: request.options.max_output_tokens,
        },
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        tracing::debug!(
            model = %request.model,
            turns = request.messages.len(),
            "Posting chat request to Ollama"
        );

        let response = self
            .client
            .post(&self.chat_url)
            .json(&request_body(&request))
            .send()
            .await
            .with_context(|| format!("Ollama request to {} failed", self.chat_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            anyhow::bail!("Ollama returned {}: {}", status, preview);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to decode Ollama chat response")?;

        let text = parsed
            .message
            .map(|m| m.content)
            .context("Ollama response had no message")?;
        Ok(text.trim().to_string())
    }
}
