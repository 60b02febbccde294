// ABOUTME: Mock backend for testing - returns pre-configured responses.
// ABOUTME: Allows deterministic tests of timeouts, failures, and concurrent generation.
//!
//! # Example
//!
//! ```no_run
//! use banter_agent::backends::mock::MockBackend;
//! use banter_agent::{ChatMessage, GenerationBackend, GenerationRequest};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let mock = MockBackend::new()
//!     .on_prompt("hello").respond_text("Hi there!")
//!     .on_prompt("slow").after(Duration::from_secs(60)).respond_text("too late");
//!
//! let request = GenerationRequest::new("test", vec![ChatMessage::user("User: hello")]);
//! assert_eq!(mock.generate(request).await.unwrap(), "Hi there!");
//! # }
//! ```

use crate::message::GenerationRequest;
use crate::traits::{GenerationBackend, SharedBackend};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock backend for testing
#[derive(Clone, Default)]
pub struct MockBackend {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    default_reply: Option<String>,
}

#[derive(Clone)]
enum Reply {
    Text(String),
    Error(String),
}

struct Expectation {
    pattern: String,
    delay: Duration,
    reply: Reply,
}

impl MockBackend {
    /// Create a new mock backend with no expectations
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with this text whenever no expectation matches
    pub fn with_default_reply(mut self, text: &str) -> Self {
        self.default_reply = Some(text.to_string());
        self
    }

    /// Set up an expectation for a request whose last turn contains `pattern`
    pub fn on_prompt(self, pattern: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            backend: self,
            pattern: pattern.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Set up an expectation matching any request
    pub fn on_any(self) -> ExpectationBuilder {
        self.on_prompt("")
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of expectations not yet consumed
    pub fn pending(&self) -> usize {
        self.expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Wrap into a shared backend handle
    pub fn into_shared(self) -> SharedBackend {
        Arc::new(self)
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::BackendFactory {
        Box::new(|config| {
            let mut backend = MockBackend::new();
            if let Some(reply) = config.get("reply").and_then(|v| v.as_str()) {
                backend = backend.with_default_reply(reply);
            }
            Ok(backend.into_shared())
        })
    }

    fn take_matching(&self, text: &str) -> Option<(Duration, Reply)> {
        // FIFO preference: front first, then the first match further back
        let mut exp = self.expectations.lock().unwrap_or_else(|e| e.into_inner());
        let index = exp.iter().position(|e| text.contains(&e.pattern))?;
        exp.remove(index).map(|e| (e.delay, e.reply))
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let text = request.last_content().unwrap_or_default().to_string();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let Some((delay, reply)) = self.take_matching(&text) else {
            return Ok(self
                .default_reply
                .clone()
                .unwrap_or_else(|| format!("Mock: no expectation for '{}'", text)));
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Error(message) => Err(anyhow::anyhow!(message)),
        }
    }
}

/// Builder for setting up mock expectations with a fluent API
pub struct ExpectationBuilder {
    backend: MockBackend,
    pattern: String,
    delay: Duration,
}

impl ExpectationBuilder {
    /// Delay the reply, simulating a slow model
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn push(self, reply: Reply) -> MockBackend {
        self.backend
            .expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Expectation {
                pattern: self.pattern,
                delay: self.delay,
                reply,
            });
        self.backend
    }

    /// Respond with a simple text result
    pub fn respond_text(self, text: &str) -> MockBackend {
        self.push(Reply::Text(text.to_string()))
    }

    /// Respond with an error
    pub fn respond_error(self, message: &str) -> MockBackend {
        self.push(Reply::Error(message.to_string()))
    }
}
