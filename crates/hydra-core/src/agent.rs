//! Agent Step data model (spec §3 "Agent Step", §4.9).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Initializing,
    Planning,
    Executing,
    Analyzing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub approved: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
}

/// One iteration of the Autonomous Agent Loop (spec §3, §4.9). Agent
/// events for a single task are delivered in monotonic `step_number`
/// order (spec §5 ordering guarantees).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStep {
    pub step_number: u32,
    pub state: AgentState,
    pub action: String,
    pub reasoning: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    pub response: Option<String>,
    pub error: Option<String>,
    pub complete: bool,
}

impl AgentStep {
    #[must_use]
    pub fn new(step_number: u32, state: AgentState) -> Self {
        Self {
            step_number,
            state,
            action: String::new(),
            reasoning: String::new(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            response: None,
            error: None,
            complete: false,
        }
    }
}

/// The plan decision parsed from the agent's planning pass (spec §4.9
/// step 1). Parse failure defaults to `generate_response`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    UseTool,
    GenerateCode,
    GenerateResponse,
    AnalyzeResults,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDecision {
    pub reasoning: String,
    pub action: PlanAction,
    pub details: Value,
    pub confidence: f64,
}

impl Default for PlanDecision {
    fn default() -> Self {
        Self {
            reasoning: String::new(),
            action: PlanAction::GenerateResponse,
            details: Value::Null,
            confidence: 0.0,
        }
    }
}
