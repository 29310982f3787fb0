//! Reasoning Executors
//!
//! Every reasoning loop satisfies one black-box contract: the user input
//! and prior turns go in; an answer plus a trace of intermediate steps
//! comes out. Executors only fail when the model call itself fails; bad
//! model output, failing capabilities and iteration exhaustion are all
//! absorbed into the trace.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────────┐
//! │ AgentSession │────▶│ dyn Executor           │
//! └──────────────┘     │  ├─ ReactExecutor      │──▶ Toolbox ──▶ capabilities
//!                      │  ├─ PlanAndExecute     │──▶ ReactExecutor per step
//!                      │  └─ SelfAskExecutor    │──▶ one search capability
//!                      └────────────────────────┘
//! ```

mod plan;
mod react;
mod self_ask;

pub use plan::PlanAndExecute;
pub use react::ReactExecutor;
pub use self_ask::SelfAskExecutor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::CapabilityDescriptor;
use crate::error::Result;
use crate::message::Message;

/// Returned when no executor produced a usable answer
pub const NO_ANSWER: &str =
    "Unable to produce an answer. Please try a different question or tool.";

/// Forced output when the iteration bound is reached
pub const EARLY_STOP_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

/// Iteration bound for single-step loops
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// What to do when the iteration bound is reached
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EarlyStopping {
    /// Return [`EARLY_STOP_MESSAGE`]
    Force,
    /// Ask the model once more for a final answer, then fall back to `Force`
    #[default]
    Generate,
}

/// One entry in an invocation trace
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceStep {
    /// A capability call and what it returned
    Action {
        capability: String,
        input: String,
        log: String,
        observation: String,
    },
    /// Model output that matched no action syntax
    FormatError { log: String, observation: String },
    /// The iteration bound was reached
    EarlyStop { iterations: usize },
    /// Steps produced by a planner
    Plan { steps: Vec<String> },
    /// One executed plan step
    PlanStep { step: String, response: String },
}

/// Answer plus trace. `output` may be empty; sessions substitute
/// [`NO_ANSWER`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutorOutput {
    pub output: String,
    pub steps: Vec<TraceStep>,
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Answer `input` given prior conversation turns
    async fn execute(&self, input: &str, history: &[Message]) -> Result<ExecutorOutput>;
}

/// Capabilities bound to one executor, in prompt order
#[derive(Clone, Debug, Default)]
pub struct Toolbox {
    capabilities: Vec<CapabilityDescriptor>,
}

impl Toolbox {
    pub const fn new(capabilities: Vec<CapabilityDescriptor>) -> Self {
        Self { capabilities }
    }

    /// Lookup by exact name, then case-insensitively
    pub fn get(&self, name: &str) -> Option<&CapabilityDescriptor> {
        let name = name.trim();
        self.capabilities
            .iter()
            .find(|c| c.name() == name)
            .or_else(|| self.capabilities.iter().find(|c| c.name().eq_ignore_ascii_case(name)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.capabilities.iter().map(CapabilityDescriptor::name).collect()
    }

    pub fn capabilities(&self) -> &[CapabilityDescriptor] {
        &self.capabilities
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// `name: description` lines for prompts
    pub fn describe(&self) -> String {
        self.capabilities
            .iter()
            .map(|c| format!("{}: {}", c.name(), c.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Invoke by name; unknown names become a corrective observation
    pub async fn invoke(&self, name: &str, input: &str) -> String {
        match self.get(name) {
            Some(capability) => capability.invoke(input).await,
            None => format!(
                "{} is not a valid tool, try one of [{}].",
                name.trim(),
                self.names().join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::capability::{CapabilitySchema, FnCapability};

    fn toolbox() -> Toolbox {
        Toolbox::new(vec![CapabilityDescriptor::available(
            CapabilitySchema::new("Calculator", "Useful for math."),
            Arc::new(FnCapability::new(|_: &str| Ok("4".into()))),
        )])
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let tools = toolbox();
        assert!(tools.get("calculator").is_some());
        assert_eq!(tools.invoke(" calculator ", "2+2").await, "4");
    }

    #[tokio::test]
    async fn test_unknown_tool_observation() {
        let out = toolbox().invoke("search", "rust").await;
        assert_eq!(out, "search is not a valid tool, try one of [Calculator].");
    }

    #[test]
    fn test_trace_step_serialization() {
        let step = TraceStep::EarlyStop { iterations: 15 };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "early_stop");
        assert_eq!(json["iterations"], 15);
    }
}
