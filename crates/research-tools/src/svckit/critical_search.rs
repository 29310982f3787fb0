//! Critical Search Capability
//!
//! A nested self-ask agent: complicated questions are broken into
//! follow-up questions, each answered by web search, then combined.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::executor::SelfAskExecutor;
use agent_core::{
    Capability, CapabilityDescriptor, CapabilitySchema, Executor, FnCapability, ModelHandle,
    Result as CoreResult,
};

/// Name the self-ask prompt uses for its search action
const SEARCH_NAME: &str = "Intermediate Answer";

pub const SEARCH_UNAVAILABLE: &str = "Search tool not available";

pub struct CriticalSearch {
    executor: SelfAskExecutor,
}

impl CriticalSearch {
    /// `search` answers follow-up questions; `None` substitutes a stub that
    /// reports search as unavailable
    pub fn new(model: ModelHandle, search: Option<Arc<dyn Capability>>) -> Self {
        let schema = CapabilitySchema::new(SEARCH_NAME, "Search");
        let provider = search.unwrap_or_else(|| {
            tracing::warn!("no search capability, critical_search will answer without search");
            Arc::new(FnCapability::new(|_: &str| Ok(SEARCH_UNAVAILABLE.to_string())))
        });

        Self {
            executor: SelfAskExecutor::new(model, CapabilityDescriptor::available(schema, provider)),
        }
    }
}

#[async_trait]
impl Capability for CriticalSearch {
    async fn run(&self, input: &str) -> CoreResult<String> {
        let result = self.executor.execute(input.trim(), &[]).await?;
        tracing::debug!(follow_ups = result.steps.len(), "critical search complete");
        Ok(result.output)
    }
}
