//! Planning-prompt construction and decision parsing (spec §4.9 step 1).
//! Grounded on `core/autonomous_agent.py::_build_reasoning_prompt` /
//! `_parse_reasoning_output` in `original_source/`.

use hydra_core::agent::{PlanAction, PlanDecision};
use hydra_core::tool::ToolDescriptor;
use tracing::warn;

/// One completed step, summarized for the next planning prompt.
pub struct StepSummary {
    pub step_number: u32,
    pub action: String,
    pub complete: bool,
}

#[must_use]
pub fn planning_prompt(task: &str, iteration: u32, history: &[StepSummary], tools: &[ToolDescriptor]) -> String {
    let previous_steps = if history.is_empty() {
        "None - this is the first step".to_string()
    } else {
        history
            .iter()
            .rev()
            .take(3)
            .rev()
            .map(|s| format!("Step {}: {} -> {}", s.step_number, s.action, if s.complete { "done" } else { "pending" }))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let tools_list =
        tools.iter().map(|t| format!("- {}: {}", t.name, t.description)).collect::<Vec<_>>().join("\n");

    format!(
        "You are an autonomous coding agent working on a task. Analyze the current \
state and decide the next action.\n\n\
TASK: {task}\n\n\
ITERATION: {iteration}\n\n\
PREVIOUS STEPS:\n{previous_steps}\n\n\
AVAILABLE TOOLS:\n{tools_list}\n\n\
Analyze the situation and decide which action to take:\n\
- use_tool: execute a specific tool\n\
- generate_code: write code to solve the problem\n\
- analyze_results: examine previous results\n\
- complete: the task is finished\n\n\
Respond in JSON format:\n\
{{\"reasoning\": \"your step-by-step analysis\", \
\"action\": \"use_tool|generate_code|generate_response|analyze_results|complete\", \
\"details\": {{\"tool\": \"tool_name if using tool\", \"parameters\": {{}}}}, \
\"confidence\": 0.0}}"
    )
}

/// Parses the planning model's reply into a [`PlanDecision`]. A
/// malformed or absent JSON object falls back to `generate_response`
/// with the raw text carried as the reasoning (spec §4.9 step 1 edge
/// case).
#[must_use]
pub fn parse_decision(output: &str) -> PlanDecision {
    if let Some(decision) = try_parse(output) {
        return decision;
    }
    warn!("planning output was not valid JSON, falling back to generate_response");
    PlanDecision { reasoning: output.to_string(), action: PlanAction::GenerateResponse, ..PlanDecision::default() }
}

fn try_parse(output: &str) -> Option<PlanDecision> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&output[start..=end]).ok()
}
