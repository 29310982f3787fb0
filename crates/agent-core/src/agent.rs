//! Agent Builder
//!
//! Turns a configuration request (strategy, model id, capability names,
//! shared memory) into a ready-to-invoke [`AgentSession`].
//!
//! Missing optional capabilities never fail a build. Only an unknown
//! strategy tag or a model factory failure does.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::executor::{
    DEFAULT_MAX_ITERATIONS, EarlyStopping, Executor, PlanAndExecute, ReactExecutor, Toolbox,
};
use crate::memory::SharedMemory;
use crate::provider::ModelFactory;
use crate::registry::CapabilityRegistry;
use crate::session::AgentSession;

/// Reasoning strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Strategy {
    /// Interleave one reasoning step with one action per iteration
    SingleStepReasoning,
    /// Produce a full plan, then resolve each step with a single-step loop
    PlanAndExecute,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleStepReasoning => "single-step-reasoning",
            Self::PlanAndExecute => "plan-and-execute",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single-step-reasoning" | "zero-shot-react" | "react" => Ok(Self::SingleStepReasoning),
            "plan-and-execute" | "plan-and-solve" => Ok(Self::PlanAndExecute),
            _ => Err(AgentError::UnknownStrategy(s.to_string())),
        }
    }
}

impl TryFrom<String> for Strategy {
    type Error = AgentError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        strategy.as_str().to_string()
    }
}

/// Builder for agent sessions
pub struct AgentBuilder {
    strategy: String,
    model: String,
    capabilities: Vec<String>,
    memory: Option<SharedMemory>,
    max_iterations: usize,
    early_stopping: EarlyStopping,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            strategy: Strategy::SingleStepReasoning.as_str().into(),
            model: "gpt-3.5-turbo".into(),
            capabilities: Vec::new(),
            memory: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            early_stopping: EarlyStopping::Generate,
        }
    }

    /// Strategy tag; validated in [`build`](Self::build)
    #[must_use]
    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Requested capability names, in prompt order
    #[must_use]
    pub fn capabilities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = names.into_iter().map(Into::into).collect();
        self
    }

    /// Memory to record turns into; a fresh one is created if unset
    #[must_use]
    pub fn memory(mut self, memory: SharedMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn early_stopping(mut self, method: EarlyStopping) -> Self {
        self.early_stopping = method;
        self
    }

    pub fn build(
        self,
        models: &dyn ModelFactory,
        registry: &CapabilityRegistry,
    ) -> Result<AgentSession> {
        let strategy: Strategy = self.strategy.parse()?;
        let model = models.create(&self.model)?;
        let resolution = registry.resolve(self.capabilities.as_slice());

        tracing::info!(
            strategy = %strategy,
            model = %model.model_id(),
            capabilities = ?resolution.names(),
            "building agent"
        );

        let tools = Toolbox::new(resolution.capabilities);
        let single_step = ReactExecutor::new(model.clone(), tools.clone())
            .max_iterations(self.max_iterations)
            .early_stopping(self.early_stopping);

        let executor: Arc<dyn Executor> = match strategy {
            Strategy::SingleStepReasoning => Arc::new(single_step),
            Strategy::PlanAndExecute => {
                Arc::new(PlanAndExecute::new(model.clone(), Arc::new(single_step)))
            }
        };

        Ok(AgentSession::new(
            strategy,
            model,
            tools,
            resolution.warnings,
            executor,
            self.memory.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::capability::{CapabilitySchema, FnCapability};
    use crate::provider::ModelHandle;
    use crate::registry::Precondition;
    use crate::testing::{ScriptedProvider, StaticModelFactory};

    fn registry() -> CapabilityRegistry {
        let mut builder = CapabilityRegistry::builder();
        builder
            .probe(CapabilitySchema::new("llm-math", "math"), Precondition::Met, || {
                Ok(Arc::new(FnCapability::new(|_: &str| Ok("Answer: 4".into()))))
            })
            .unwrap()
            .probe(
                CapabilitySchema::new("google-search", "search"),
                Precondition::missing("GOOGLE_API_KEY not found"),
                || unreachable!(),
            )
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_strategy_tags() {
        assert_eq!("zero-shot-react".parse::<Strategy>().unwrap(), Strategy::SingleStepReasoning);
        assert_eq!("plan-and-solve".parse::<Strategy>().unwrap(), Strategy::PlanAndExecute);
        assert_eq!("Plan-And-Execute".parse::<Strategy>().unwrap(), Strategy::PlanAndExecute);
        assert!(matches!(
            "tree-of-thought".parse::<Strategy>(),
            Err(AgentError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&Strategy::PlanAndExecute).unwrap();
        assert_eq!(json, "\"plan-and-execute\"");
        let parsed: Strategy = serde_json::from_str("\"react\"").unwrap();
        assert_eq!(parsed, Strategy::SingleStepReasoning);
        assert!(serde_json::from_str::<Strategy>("\"bogus\"").is_err());
    }

    #[test]
    fn test_unknown_strategy_fails_build() {
        let factory = StaticModelFactory::new(ScriptedProvider::always("Final Answer: x"));
        let err = AgentBuilder::new()
            .strategy("tree-of-thought")
            .build(&factory, &registry())
            .unwrap_err();
        assert!(matches!(err, AgentError::UnknownStrategy(_)));
    }

    #[test]
    fn test_model_factory_failure_fails_build() {
        struct Broken;
        impl ModelFactory for Broken {
            fn create(&self, model_id: &str) -> Result<ModelHandle> {
                Err(AgentError::Config(format!("no key for {model_id}")))
            }
        }
        let err = AgentBuilder::new().build(&Broken, &registry()).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_missing_capabilities_degrade() {
        let factory = StaticModelFactory::new(ScriptedProvider::always("Final Answer: x"));
        let session = AgentBuilder::new()
            .strategy("plan-and-execute")
            .capabilities(["google-search", "llm-math", "nonexistent-tool"])
            .build(&factory, &registry())
            .unwrap();

        assert_eq!(session.strategy(), Strategy::PlanAndExecute);
        assert_eq!(session.capability_names(), vec!["llm-math"]);
        assert_eq!(session.warnings().len(), 2);
    }
}
