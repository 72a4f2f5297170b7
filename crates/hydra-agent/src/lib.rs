//! Autonomous Agent Loop (spec §4.9): plan, execute, analyze, repeat
//! until completion or `n_max_agent_iterations`. Grounded on
//! `core/autonomous_agent.py` in `original_source/`, re-expressed as an
//! `Event` stream over the Reasoning Engine and Tool Registry.

pub mod decision;

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use hydra_core::agent::{AgentState, PlanAction, PlanDecision, ToolCall, ToolResult};
use hydra_core::config::HydraConfig;
use hydra_core::event::Event;
use hydra_core::reasoning::ReasoningMode;
use hydra_core::Result;
use hydra_reasoning::{ReasoningContext, ReasoningEngine};
use hydra_tools::ToolRegistry;
use tracing::{info, warn};

use decision::StepSummary;

pub struct AgentLoop {
    reasoning: Arc<ReasoningEngine>,
    tools: Arc<ToolRegistry>,
    config: HydraConfig,
}

impl AgentLoop {
    #[must_use]
    pub fn new(reasoning: Arc<ReasoningEngine>, tools: Arc<ToolRegistry>, config: HydraConfig) -> Self {
        Self { reasoning, tools, config }
    }

    /// Runs the loop, yielding an [`Event`] per state transition, per
    /// tool call/result, and a final `Chunk`/`Done` pair. Stops early
    /// once a step reports `complete`, otherwise runs at most
    /// `config.n_max_agent_iterations` steps (spec §4.9 "Safety limit").
    pub async fn run(&self, task: String) -> Result<Pin<Box<dyn Stream<Item = Event> + Send>>> {
        let reasoning = self.reasoning.clone();
        let tools = self.tools.clone();
        let max_iterations = self.config.n_max_agent_iterations;

        let s = async_stream::stream! {
            yield Event::StateChange { state: AgentState::Initializing, step_number: 0 };

            let mut history: Vec<StepSummary> = Vec::new();
            let mut iteration = 0u32;
            let mut task_complete = false;

            while !task_complete && iteration < max_iterations {
                iteration += 1;

                yield Event::StateChange { state: AgentState::Planning, step_number: iteration };
                let descriptors = tools.list_tools();
                let prompt = decision::planning_prompt(&task, iteration, &history, &descriptors);
                let decision = match reasoning.reason(&prompt, ReasoningContext::default(), Some(ReasoningMode::Auto)).await {
                    Ok(record) => decision::parse_decision(&record.response_text),
                    Err(err) => {
                        warn!(%err, "planning pass failed, falling back to generate_response");
                        PlanDecision {
                            reasoning: format!("reasoning failed: {err}"),
                            action: PlanAction::GenerateResponse,
                            ..PlanDecision::default()
                        }
                    }
                };

                yield Event::StateChange { state: AgentState::Executing, step_number: iteration };
                let (tool_calls, tool_results, response, error) = execute_decision(&tools, &decision).await;
                for call in &tool_calls {
                    yield Event::ToolCall { call: call.clone() };
                }
                for result in &tool_results {
                    yield Event::ToolResult { result: result.clone() };
                }
                if let Some(text) = &response {
                    yield Event::Chunk { text: text.clone() };
                }
                if let Some(err) = &error {
                    warn!(step = iteration, error = %err, "step execution reported an error");
                }

                yield Event::StateChange { state: AgentState::Analyzing, step_number: iteration };
                // Only an explicit `complete` decision ends the loop; every
                // other action, even an erroring one, continues to the next
                // iteration (spec §4.9 step 3).
                let complete = matches!(decision.action, PlanAction::Complete);
                task_complete = complete;

                history.push(StepSummary {
                    step_number: iteration,
                    action: format!("{:?}", decision.action),
                    complete,
                });

                info!(iteration, complete, "agent step finished");
            }

            if task_complete {
                yield Event::StateChange { state: AgentState::Completed, step_number: iteration };
            } else {
                yield Event::StateChange { state: AgentState::Failed, step_number: iteration };
            }
            yield Event::Done;
        };

        Ok(Box::pin(s))
    }
}

async fn execute_decision(
    tools: &ToolRegistry,
    decision: &PlanDecision,
) -> (Vec<ToolCall>, Vec<ToolResult>, Option<String>, Option<String>) {
    match decision.action {
        PlanAction::UseTool => {
            let tool_name = decision.details.get("tool").and_then(serde_json::Value::as_str);
            let Some(tool_name) = tool_name else {
                return (Vec::new(), Vec::new(), None, Some("use_tool action missing `tool`".to_string()));
            };
            let parameters = decision.details.get("parameters").cloned().unwrap_or(serde_json::json!({}));
            let call = ToolCall { tool_name: tool_name.to_string(), arguments: parameters.clone() };
            let outcome = tools.call(tool_name, parameters).await;
            let result = ToolResult {
                tool_name: outcome.tool_name,
                approved: outcome.approved,
                output: outcome.output,
                error: outcome.error.clone(),
            };
            (vec![call], vec![result.clone()], None, result.error)
        }
        PlanAction::GenerateCode | PlanAction::GenerateResponse => {
            (Vec::new(), Vec::new(), Some(decision.reasoning.clone()), None)
        }
        PlanAction::AnalyzeResults => (Vec::new(), Vec::new(), Some("analyzing previous results".to_string()), None),
        PlanAction::Complete => (Vec::new(), Vec::new(), Some("task marked complete by agent".to_string()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_core::agent::PlanAction;

    #[tokio::test]
    async fn complete_action_short_circuits_with_no_error() {
        let tools = ToolRegistry::new();
        let decision = PlanDecision { action: PlanAction::Complete, ..PlanDecision::default() };
        let (calls, results, response, error) = execute_decision(&tools, &decision).await;
        assert!(calls.is_empty());
        assert!(results.is_empty());
        assert!(response.is_some());
        assert!(error.is_none());
    }

    #[tokio::test]
    async fn use_tool_without_tool_name_reports_error() {
        let tools = ToolRegistry::new();
        let decision = PlanDecision { action: PlanAction::UseTool, ..PlanDecision::default() };
        let (_, _, _, error) = execute_decision(&tools, &decision).await;
        assert!(error.is_some());
    }
}
