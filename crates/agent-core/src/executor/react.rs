//! Single-Step Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern: each iteration the model
//! either names one capability call or gives a final answer. Observations
//! are appended to the transcript and the loop repeats, up to
//! `max_iterations`.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{
    DEFAULT_MAX_ITERATIONS, EARLY_STOP_MESSAGE, EarlyStopping, Executor, ExecutorOutput, Toolbox,
    TraceStep,
};
use crate::error::Result;
use crate::message::{Conversation, Message};
use crate::provider::ModelHandle;

const PROMPT_PREFIX: &str = "Answer the following questions as best you can. You have access to the following tools:";

const FORMAT_INSTRUCTIONS: &str = r"Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!";

const EARLY_STOP_PROMPT: &str = "You have run out of steps. Using only the observations above, \
give your best answer now, starting with 'Final Answer:'.";

const OBSERVATION_STOP: &str = "\nObservation:";

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:\s*(.*?)\s*Action\s*\d*\s*Input\s*\d*\s*:\s*(.*)")
        .expect("valid action regex")
});

static FINAL_ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)final\s+answer\s*:").expect("valid final answer regex"));

/// Parsed model output
#[derive(Debug, PartialEq, Eq)]
enum Decision {
    Finish(String),
    Act { capability: String, input: String },
    Invalid(String),
}

fn parse_decision(text: &str) -> Decision {
    let final_at = FINAL_ANSWER_RE.find(text);
    let action = ACTION_RE.captures(text);

    if let Some(caps) = action {
        let starts_first = final_at.is_none_or(|m| caps.get(0).is_some_and(|a| a.start() < m.start()));
        if starts_first {
            let capability = caps[1].trim().to_string();
            let input = caps[2]
                .trim()
                .trim_matches('"')
                .trim()
                .to_string();
            return Decision::Act { capability, input };
        }
    }

    if let Some(m) = final_at {
        return Decision::Finish(text[m.end()..].trim().to_string());
    }

    if text.to_ascii_lowercase().contains("action:") {
        Decision::Invalid("Invalid Format: Missing 'Action Input:' after 'Action:'".into())
    } else {
        Decision::Invalid("Invalid Format: Missing 'Action:' after 'Thought:'".into())
    }
}

/// ReAct executor over a model handle and a toolbox
pub struct ReactExecutor {
    model: ModelHandle,
    tools: Toolbox,
    max_iterations: usize,
    early_stopping: EarlyStopping,
}

impl ReactExecutor {
    pub const fn new(model: ModelHandle, tools: Toolbox) -> Self {
        Self {
            model,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            early_stopping: EarlyStopping::Generate,
        }
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

    pub const fn tools(&self) -> &Toolbox {
        &self.tools
    }

    /// Build the system prompt including tool descriptions
    fn build_system_prompt(&self) -> String {
        let tools = if self.tools.is_empty() {
            "(no tools available; answer directly)".to_string()
        } else {
            self.tools.describe()
        };
        format!(
            "{PROMPT_PREFIX}\n\n{tools}\n\n{}",
            FORMAT_INSTRUCTIONS.replace("{tool_names}", &self.tools.names().join(", "))
        )
    }

    async fn stop_early(&self, conversation: &mut Conversation, steps: &mut Vec<TraceStep>) -> Result<String> {
        tracing::warn!(iterations = self.max_iterations, "iteration bound reached, stopping early");
        steps.push(TraceStep::EarlyStop {
            iterations: self.max_iterations,
        });

        if self.early_stopping == EarlyStopping::Force {
            return Ok(EARLY_STOP_MESSAGE.into());
        }

        conversation.push(Message::user(EARLY_STOP_PROMPT));
        let completion = self.model.complete(conversation.messages()).await?;
        let answer = match parse_decision(&completion.content) {
            Decision::Finish(answer) => answer,
            Decision::Invalid(_) => completion.content.trim().to_string(),
            Decision::Act { .. } => String::new(),
        };

        if answer.is_empty() {
            Ok(EARLY_STOP_MESSAGE.into())
        } else {
            Ok(answer)
        }
    }
}

#[async_trait]
impl Executor for ReactExecutor {
    async fn execute(&self, input: &str, history: &[Message]) -> Result<ExecutorOutput> {
        let mut conversation = Conversation::with_system_prompt(self.build_system_prompt());
        conversation.extend(history.iter().cloned());
        conversation.push(Message::user(format!("Question: {input}\nThought:")));

        let mut steps = Vec::new();

        for iteration in 1..=self.max_iterations {
            let completion = self
                .model
                .complete_until(conversation.messages(), &[OBSERVATION_STOP])
                .await?;
            let text = completion.content;

            match parse_decision(&text) {
                Decision::Finish(answer) => {
                    tracing::debug!(iteration, "final answer reached");
                    return Ok(ExecutorOutput {
                        output: answer,
                        steps,
                    });
                }
                Decision::Act { capability, input } => {
                    tracing::debug!(iteration, capability = %capability, "executing capability");
                    let observation = self.tools.invoke(&capability, &input).await;

                    conversation.push(Message::assistant(&text));
                    conversation.push(Message::tool(&capability, format!("Observation: {observation}\nThought:")));
                    steps.push(TraceStep::Action {
                        capability,
                        input,
                        log: text,
                        observation,
                    });
                }
                Decision::Invalid(observation) => {
                    tracing::debug!(iteration, "unparseable model output, asking for correction");
                    conversation.push(Message::assistant(&text));
                    conversation.push(Message::user(format!("Observation: {observation}\nThought:")));
                    steps.push(TraceStep::FormatError {
                        log: text,
                        observation,
                    });
                }
            }
        }

        let output = self.stop_early(&mut conversation, &mut steps).await?;
        Ok(ExecutorOutput { output, steps })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::capability::{CapabilityDescriptor, CapabilitySchema, FnCapability};
    use crate::error::AgentError;
    use crate::provider::GenerationOptions;
    use crate::testing::ScriptedProvider;

    fn handle(provider: ScriptedProvider) -> ModelHandle {
        ModelHandle::new(Arc::new(provider), GenerationOptions::default())
    }

    fn calculator() -> Toolbox {
        Toolbox::new(vec![CapabilityDescriptor::available(
            CapabilitySchema::new("Calculator", "Useful for math."),
            Arc::new(FnCapability::new(|input: &str| Ok(format!("Answer: {}", input.len())))),
        )])
    }

    #[test]
    fn test_parse_final_answer() {
        assert_eq!(parse_decision("final answer: 42"), Decision::Finish("42".into()));
        assert_eq!(
            parse_decision("Thought: I now know the final answer\nFinal Answer: Paris"),
            Decision::Finish("Paris".into())
        );
    }

    #[test]
    fn test_parse_action() {
        let text = "Thought: I should search\nAction: wikipedia\nAction Input: \"Alan Turing\"";
        assert_eq!(
            parse_decision(text),
            Decision::Act {
                capability: "wikipedia".into(),
                input: "Alan Turing".into()
            }
        );
    }

    #[test]
    fn test_parse_missing_action_input() {
        match parse_decision("Thought: hmm\nAction: wikipedia") {
            Decision::Invalid(msg) => assert!(msg.contains("Action Input")),
            other => panic!("unexpected {other:?}"),
        }
        match parse_decision("I am not sure") {
            Decision::Invalid(msg) => assert!(msg.contains("Missing 'Action:'")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_immediate_final_answer() {
        let provider = ScriptedProvider::always("final answer: 42");
        let executor = ReactExecutor::new(handle(provider.clone()), calculator());
        let out = executor.execute("anything", &[]).await.unwrap();
        assert_eq!(out.output, "42");
        assert!(out.steps.is_empty());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_action_then_answer() {
        let provider = ScriptedProvider::sequence([
            "Thought: compute\nAction: Calculator\nAction Input: 2+2",
            "Thought: I now know the final answer\nFinal Answer: 4",
        ]);
        let executor = ReactExecutor::new(handle(provider), calculator());
        let out = executor.execute("what is 2+2", &[]).await.unwrap();

        assert_eq!(out.output, "4");
        assert_eq!(out.steps.len(), 1);
        match &out.steps[0] {
            TraceStep::Action { capability, observation, .. } => {
                assert_eq!(capability, "Calculator");
                assert_eq!(observation, "Answer: 3");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exhaustion_forces_stop() {
        let provider = ScriptedProvider::always("Action: Calculator\nAction Input: 1+1");
        let executor = ReactExecutor::new(handle(provider.clone()), calculator())
            .max_iterations(3)
            .early_stopping(EarlyStopping::Force);
        let out = executor.execute("loop", &[]).await.unwrap();

        assert_eq!(out.output, EARLY_STOP_MESSAGE);
        assert_eq!(provider.calls(), 3);
        assert_eq!(out.steps.last(), Some(&TraceStep::EarlyStop { iterations: 3 }));
    }

    #[tokio::test]
    async fn test_exhaustion_generates_final_answer() {
        let provider = ScriptedProvider::sequence([
            "Action: Calculator\nAction Input: 1+1",
            "Action: Calculator\nAction Input: 1+1",
            "Final Answer: probably 2",
        ]);
        let executor = ReactExecutor::new(handle(provider), calculator()).max_iterations(2);
        let out = executor.execute("loop", &[]).await.unwrap();
        assert_eq!(out.output, "probably 2");
    }

    #[tokio::test]
    async fn test_format_errors_are_recovered() {
        let provider = ScriptedProvider::sequence(["I think it is four", "Final Answer: 4"]);
        let executor = ReactExecutor::new(handle(provider), calculator());
        let out = executor.execute("2+2", &[]).await.unwrap();

        assert_eq!(out.output, "4");
        assert!(matches!(out.steps[0], TraceStep::FormatError { .. }));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let executor = ReactExecutor::new(handle(ScriptedProvider::failing("503")), calculator());
        let err = executor.execute("x", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }
}
