//! Reasoning Record data model (spec §3, §4.8 "Reasoning Engine").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningMode {
    Fast,
    Standard,
    Extended,
    Deep,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStyle {
    ChainOfThought,
    TreeOfThought,
    SelfCritique,
    IterativeRefine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningRecord {
    pub mode: ReasoningMode,
    pub style: ReasoningStyle,
    pub thinking_budget: u32,
    pub critique_iterations: u32,
    pub thinking_text: String,
    pub response_text: String,
    pub model_used: String,
}

/// Axes scored by the analyst model for auto mode selection (spec §4.8).
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityAxes {
    pub complexity: f64,
    pub ambiguity: f64,
    pub novelty: f64,
    pub risk: f64,
}

impl ComplexityAxes {
    #[must_use]
    pub fn average(&self) -> f64 {
        (self.complexity + self.ambiguity + self.novelty + self.risk) / 4.0
    }
}

/// Selects a reasoning mode from the averaged axis score (spec §4.8
/// "Auto selection"): `>= deep_threshold` (default 8.0) is `deep`; `< 4`
/// is `fast`; `< 7` is `standard`; otherwise `extended`.
#[must_use]
pub fn select_mode_from_axes(axes: ComplexityAxes, deep_threshold: f64) -> ReasoningMode {
    let avg = axes.average();
    if avg >= deep_threshold {
        ReasoningMode::Deep
    } else if avg < 4.0 {
        ReasoningMode::Fast
    } else if avg < 7.0 {
        ReasoningMode::Standard
    } else {
        ReasoningMode::Extended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_threshold_selects_deep() {
        let axes = ComplexityAxes {
            complexity: 9.0,
            ambiguity: 8.0,
            novelty: 8.0,
            risk: 9.0,
        };
        assert_eq!(select_mode_from_axes(axes, 8.0), ReasoningMode::Deep);
    }

    #[test]
    fn low_average_selects_fast() {
        let axes = ComplexityAxes {
            complexity: 1.0,
            ambiguity: 1.0,
            novelty: 1.0,
            risk: 1.0,
        };
        assert_eq!(select_mode_from_axes(axes, 8.0), ReasoningMode::Fast);
    }

    #[test]
    fn mid_average_selects_standard_then_extended() {
        let standard = ComplexityAxes {
            complexity: 5.0,
            ambiguity: 5.0,
            novelty: 5.0,
            risk: 5.0,
        };
        assert_eq!(select_mode_from_axes(standard, 8.0), ReasoningMode::Standard);

        let extended = ComplexityAxes {
            complexity: 7.5,
            ambiguity: 7.5,
            novelty: 7.0,
            risk: 7.0,
        };
        assert_eq!(select_mode_from_axes(extended, 8.0), ReasoningMode::Extended);
    }
}
