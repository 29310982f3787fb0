//! Plan-and-Execute
//!
//! A planner call turns the request into numbered steps; each step is then
//! resolved in order by a single-step sub-loop that sees the results of the
//! steps before it.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::{EARLY_STOP_MESSAGE, Executor, ExecutorOutput, NO_ANSWER, TraceStep};
use crate::error::Result;
use crate::message::{Conversation, Message};
use crate::provider::ModelHandle;

const PLANNER_PROMPT: &str = "Let's first understand the problem and devise a plan to solve the problem. \
Please output the plan starting with the header 'Plan:' and then followed by a numbered list of steps. \
Please make the plan the minimum number of steps required to accurately complete the task. \
If the task is a question, the final step should almost always be 'Given the above steps taken, \
please respond to the users original question'. At the end of your plan, say '<END_OF_PLAN>'";

const END_OF_PLAN: &str = "<END_OF_PLAN>";

static STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\s*[.)]\s*(.+?)\s*$").expect("valid plan step regex"));

/// Numbered steps from planner output
fn parse_plan(text: &str) -> Vec<String> {
    let text = text.split(END_OF_PLAN).next().unwrap_or_default();
    STEP_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .filter(|step| !step.is_empty())
        .collect()
}

/// Whether a step response can stand as the answer
fn is_usable(response: &str) -> bool {
    let response = response.trim();
    !response.is_empty() && response != EARLY_STOP_MESSAGE
}

/// Last usable response, scanning backwards
fn select_answer(responses: &[&str]) -> String {
    responses
        .iter()
        .rev()
        .find(|r| is_usable(r))
        .map_or_else(|| NO_ANSWER.to_string(), |r| r.trim().to_string())
}

pub struct PlanAndExecute {
    planner: ModelHandle,
    step_executor: Arc<dyn Executor>,
}

impl PlanAndExecute {
    pub fn new(planner: ModelHandle, step_executor: Arc<dyn Executor>) -> Self {
        Self {
            planner,
            step_executor,
        }
    }

    async fn plan(&self, input: &str, history: &[Message]) -> Result<Vec<String>> {
        let mut conversation = Conversation::with_system_prompt(PLANNER_PROMPT);
        conversation.extend(history.iter().cloned());
        conversation.push(Message::user(input));

        let completion = self.planner.complete(conversation.messages()).await?;
        let steps = parse_plan(&completion.content);

        if steps.is_empty() {
            tracing::warn!("planner produced no numbered steps, executing the request as one step");
            return Ok(vec![input.to_string()]);
        }
        Ok(steps)
    }
}

fn step_input(objective: &str, previous: &[(String, String)], current: &str) -> String {
    let previous = previous
        .iter()
        .map(|(step, response)| format!("Step: {step}\n\nResponse: {response}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Original question: {objective}\n\nPrevious steps: {previous}\n\nCurrent objective: {current}"
    )
}

#[async_trait]
impl Executor for PlanAndExecute {
    async fn execute(&self, input: &str, history: &[Message]) -> Result<ExecutorOutput> {
        let plan = self.plan(input, history).await?;
        tracing::info!(steps = plan.len(), "plan created");

        let mut trace = vec![TraceStep::Plan {
            steps: plan.clone(),
        }];
        let mut completed: Vec<(String, String)> = Vec::with_capacity(plan.len());

        for (index, step) in plan.iter().enumerate() {
            tracing::debug!(step = index + 1, objective = %step, "executing plan step");
            let result = self
                .step_executor
                .execute(&step_input(input, &completed, step), &[])
                .await?;

            trace.extend(result.steps);
            trace.push(TraceStep::PlanStep {
                step: step.clone(),
                response: result.output.clone(),
            });
            completed.push((step.clone(), result.output));
        }

        let responses: Vec<&str> = completed.iter().map(|(_, r)| r.as_str()).collect();
        Ok(ExecutorOutput {
            output: select_answer(&responses),
            steps: trace,
        })
    }
}
