// ABOUTME: Pluggable text-generation backend abstraction for banter.
// ABOUTME: Provides the GenerationBackend trait, a registry, and Ollama/mock backends.

pub mod config;
pub mod message;
pub mod registry;
pub mod traits;

pub mod backends;

pub use message::{ChatMessage, GenerationOptions, GenerationRequest, Role};
pub use registry::{BackendFactory, BackendRegistry};
pub use traits::{GenerationBackend, SharedBackend};
