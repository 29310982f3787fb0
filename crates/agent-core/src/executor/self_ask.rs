//! Self-Ask With Search
//!
//! Decomposes a question into follow-up questions, answers each with a
//! single search capability, and combines the intermediate answers.

use async_trait::async_trait;

use super::{DEFAULT_MAX_ITERATIONS, EARLY_STOP_MESSAGE, Executor, ExecutorOutput, TraceStep};
use crate::capability::CapabilityDescriptor;
use crate::error::Result;
use crate::message::Message;
use crate::provider::ModelHandle;

const FEW_SHOT: &str = "Question: Who lived longer, Muhammad Ali or Alan Turing?
Are follow up questions needed here: Yes.
Follow up: How old was Muhammad Ali when he died?
Intermediate answer: Muhammad Ali was 74 years old when he died.
Follow up: How old was Alan Turing when he died?
Intermediate answer: Alan Turing was 41 years old when he died.
So the final answer is: Muhammad Ali

Question: When was the founder of craigslist born?
Are follow up questions needed here: Yes.
Follow up: Who was the founder of craigslist?
Intermediate answer: Craigslist was founded by Craig Newmark.
Follow up: When was Craig Newmark born?
Intermediate answer: Craig Newmark was born on December 6, 1952.
So the final answer is: December 6, 1952

Question: Are both the directors of Jaws and Casino Royale from the same country?
Are follow up questions needed here: Yes.
Follow up: Who is the director of Jaws?
Intermediate answer: The director of Jaws is Steven Spielberg.
Follow up: Where is Steven Spielberg from?
Intermediate answer: The United States.
Follow up: Who is the director of Casino Royale?
Intermediate answer: The director of Casino Royale is Martin Campbell.
Follow up: Where is Martin Campbell from?
Intermediate answer: New Zealand.
So the final answer is: No";

const FOLLOW_UP: &str = "Follow up:";
const FINAL_ANSWER: &str = "So the final answer is:";
const INTERMEDIATE_STOP: &str = "\nIntermediate answer:";

#[derive(Debug, PartialEq, Eq)]
enum Move {
    Ask(String),
    Finish(String),
    Invalid,
}

fn parse_move(text: &str) -> Move {
    if let Some(at) = text.rfind(FINAL_ANSWER) {
        return Move::Finish(text[at + FINAL_ANSWER.len()..].trim().to_string());
    }

    let last_line = text.trim_end().lines().last().unwrap_or_default();
    match last_line.find(FOLLOW_UP) {
        Some(at) => Move::Ask(last_line[at + FOLLOW_UP.len()..].trim().to_string()),
        None => Move::Invalid,
    }
}

pub struct SelfAskExecutor {
    model: ModelHandle,
    search: CapabilityDescriptor,
    max_iterations: usize,
}

impl SelfAskExecutor {
    /// `search` answers the follow-up questions
    pub const fn new(model: ModelHandle, search: CapabilityDescriptor) -> Self {
        Self {
            model,
            search,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }
}

#[async_trait]
impl Executor for SelfAskExecutor {
    async fn execute(&self, input: &str, _history: &[Message]) -> Result<ExecutorOutput> {
        let system = Message::system(FEW_SHOT);
        let mut scratchpad = String::new();
        let mut steps = Vec::new();

        for _ in 0..self.max_iterations {
            let prompt = format!("Question: {input}\nAre follow up questions needed here:{scratchpad}");
            let messages = [system.clone(), Message::user(prompt)];
            let completion = self.model.complete_until(&messages, &[INTERMEDIATE_STOP]).await?;
            let text = completion.content;

            match parse_move(&text) {
                Move::Finish(answer) => return Ok(ExecutorOutput { output: answer, steps }),
                Move::Ask(question) => {
                    let observation = self.search.invoke(&question).await;
                    scratchpad.push_str(&text);
                    scratchpad.push_str(&format!("\nIntermediate answer: {observation}\n"));
                    steps.push(TraceStep::Action {
                        capability: self.search.name().to_string(),
                        input: question,
                        log: text,
                        observation,
                    });
                }
                Move::Invalid => {
                    let observation = format!(
                        "Invalid Format: expected '{FOLLOW_UP}' or '{FINAL_ANSWER}'"
                    );
                    scratchpad.push_str(&text);
                    scratchpad.push_str(&format!("\n{observation}\n"));
                    steps.push(TraceStep::FormatError {
                        log: text,
                        observation,
                    });
                }
            }
        }

        steps.push(TraceStep::EarlyStop {
            iterations: self.max_iterations,
        });
        Ok(ExecutorOutput {
            output: EARLY_STOP_MESSAGE.into(),
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::capability::{CapabilitySchema, FnCapability};
    use crate::testing::ScriptedProvider;

    fn search() -> CapabilityDescriptor {
        CapabilityDescriptor::available(
            CapabilitySchema::new("Intermediate Answer", "Search"),
            Arc::new(FnCapability::new(|q: &str| {
                Ok(if q.contains("founder") { "Craig Newmark".into() } else { "1952".into() })
            })),
        )
    }

    #[test]
    fn test_parse_move() {
        assert_eq!(
            parse_move(" Yes.\nFollow up: Who founded craigslist?"),
            Move::Ask("Who founded craigslist?".into())
        );
        assert_eq!(parse_move("So the final answer is: 1952"), Move::Finish("1952".into()));
        assert_eq!(parse_move("No idea"), Move::Invalid);
    }

    #[tokio::test]
    async fn test_follow_ups_then_answer() {
        let provider = ScriptedProvider::sequence([
            " Yes.\nFollow up: Who was the founder of craigslist?",
            "Follow up: When was Craig Newmark born?",
            "So the final answer is: 1952",
        ]);
        let executor = SelfAskExecutor::new(provider.handle("gpt-3.5-turbo"), search());
        let out = executor.execute("When was the founder of craigslist born?", &[]).await.unwrap();

        assert_eq!(out.output, "1952");
        assert_eq!(out.steps.len(), 2);
        match &out.steps[0] {
            TraceStep::Action { observation, .. } => assert_eq!(observation, "Craig Newmark"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bounded() {
        let provider = ScriptedProvider::always("Follow up: again?");
        let executor =
            SelfAskExecutor::new(provider.handle("gpt-3.5-turbo"), search()).max_iterations(2);
        let out = executor.execute("loop", &[]).await.unwrap();
        assert_eq!(out.output, EARLY_STOP_MESSAGE);
        assert_eq!(provider.calls(), 2);
    }
}
