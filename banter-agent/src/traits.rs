// ABOUTME: Core GenerationBackend trait that all backends implement.
// ABOUTME: One request in, one complete text response out.

use crate::GenerationRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Core trait that all generation backends implement.
///
/// Implementations must tolerate concurrent calls: several agents may be
/// generating at the same time against one backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name for logging and metrics
    fn name(&self) -> &'static str;

    /// Run a request to completion and return the raw model text
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

/// Shared handle passed to dispatch units
pub type SharedBackend = Arc<dyn GenerationBackend>;
