//! Request and routing-hint data model (spec §3 "Request", §4.4 "Router").

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::node::NodeId;

/// Selection policy applied to the candidate node set for one request
/// (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    Fast,
    Reliable,
    Async,
    #[default]
    Balanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub repeat_penalty: f64,
    pub max_tokens: Option<u32>,
    /// Seconds to keep the model resident after this call; `Some(0)` is
    /// the Pool Facade's proactive-eviction hint for large models.
    pub keep_alive: Option<i64>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            repeat_penalty: 1.1,
            max_tokens: None,
            keep_alive: None,
        }
    }
}

/// Hints that steer the Router's node selection for a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingHints {
    pub mode: RoutingMode,
    pub priority: u8,
    pub min_success_rate: Option<f64>,
    pub prefer_cpu: bool,
    pub prefer_local: bool,
    pub min_vram_gb: Option<f64>,
    pub node_id: Option<NodeId>,
}

impl Default for RoutingHints {
    fn default() -> Self {
        Self {
            mode: RoutingMode::default(),
            priority: 5,
            min_success_rate: None,
            prefer_cpu: false,
            prefer_local: false,
            min_vram_gb: None,
            node_id: None,
        }
    }
}

impl RoutingHints {
    /// Clamps `priority` into the documented `[1, 10]` range.
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 10);
        self
    }
}

/// A single generation request (spec §3 "Request"). Created by the Pool
/// Facade; immutable thereafter; disposed when the response stream closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    pub prompt: String,
    pub model: Option<String>,
    pub options: GenerationOptions,
    pub hints: RoutingHints,
}

impl Request {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            model: None,
            options: GenerationOptions::default(),
            hints: RoutingHints::default(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_hints(mut self, hints: RoutingHints) -> Self {
        self.hints = hints;
        self
    }
}

/// Response returned by a non-streaming `generate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
    pub duration_ms: u64,
    pub model: String,
    pub node_id: NodeId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_clamped() {
        let hints = RoutingHints::default().with_priority(20);
        assert_eq!(hints.priority, 10);
        let hints = RoutingHints::default().with_priority(0);
        assert_eq!(hints.priority, 1);
    }

    #[test]
    fn request_defaults_to_balanced_mode() {
        let req = Request::new("hello");
        assert_eq!(req.hints.mode, RoutingMode::Balanced);
    }
}
