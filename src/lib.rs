// ABOUTME: Root library for the banter binary
// ABOUTME: Hosts the transports and re-exports the scheduler crates

pub mod platform;

pub use banter_core::{
    commands, config, context, conversation, dispatcher, orchestrator, profile, traits, watchdog,
};

pub use banter_agent::{BackendRegistry, GenerationBackend, SharedBackend};
