//! Agent Sessions
//!
//! One configured, invocable agent. A session is stateless between
//! invocations apart from the shared memory it records turns into.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::Strategy;
use crate::error::{AgentError, Result};
use crate::executor::{Executor, NO_ANSWER, Toolbox, TraceStep};
use crate::memory::SharedMemory;
use crate::provider::ModelHandle;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one invocation. `output` is never empty.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentOutput {
    pub output: String,
    pub intermediate_steps: Vec<TraceStep>,
}

pub struct AgentSession {
    id: SessionId,
    strategy: Strategy,
    model: ModelHandle,
    tools: Toolbox,
    warnings: Vec<String>,
    executor: Arc<dyn Executor>,
    memory: SharedMemory,
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("id", &self.id)
            .field("strategy", &self.strategy)
            .field("model", &self.model_id())
            .field("capabilities", &self.capability_names())
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

impl AgentSession {
    pub(crate) fn new(
        strategy: Strategy,
        model: ModelHandle,
        tools: Toolbox,
        warnings: Vec<String>,
        executor: Arc<dyn Executor>,
        memory: SharedMemory,
    ) -> Self {
        Self {
            id: SessionId::new(),
            strategy,
            model,
            tools,
            warnings,
            executor,
            memory,
            created_at: Utc::now(),
        }
    }

    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Bound capability names, in prompt order
    pub fn capability_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    /// Warnings for requested capabilities that could not be bound
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub const fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Run one turn. Turns on the same memory are serialized.
    pub async fn invoke(&self, input: &str) -> Result<AgentOutput> {
        let _turn = self.memory.begin_turn().await;
        let history = self.memory.snapshot().await;

        tracing::info!(session = %self.id, strategy = %self.strategy, "invoking agent");
        let result = self.executor.execute(input, &history).await?;

        let output = match result.output.trim() {
            "" => {
                tracing::warn!(session = %self.id, "executor produced no output");
                NO_ANSWER.to_string()
            }
            text => text.to_string(),
        };

        self.memory.record_turn(input, output.clone()).await;

        Ok(AgentOutput {
            output,
            intermediate_steps: result.steps,
        })
    }

    /// [`invoke`](Self::invoke) bounded by `timeout`. A timed-out turn is
    /// not recorded and the session stays usable.
    pub async fn invoke_with_timeout(&self, input: &str, timeout: Duration) -> Result<AgentOutput> {
        tokio::time::timeout(timeout, self.invoke(input))
            .await
            .map_err(|_| {
                tracing::warn!(session = %self.id, ?timeout, "invocation timed out");
                AgentError::Timeout(timeout)
            })?
    }
}
