// ABOUTME: Backend implementations (Ollama HTTP, scripted mock).
// ABOUTME: Each backend implements the GenerationBackend trait.

pub mod mock;
pub mod ollama;
