//! Complexity analysis (spec §4.7 step 1).

use hydra_core::task::Complexity;
use hydra_core::Result;
use hydra_pool::Pool;
use tracing::warn;

const ANALYSIS_TEMPLATE: &str = "Analyze this task complexity. Respond with only: SIMPLE, MODERATE, or COMPLEX\n\n\
Task: {task}\n\n\
Criteria:\n\
- SIMPLE: Single step, straightforward, no dependencies\n\
- MODERATE: 2-3 steps, some context needed, minimal dependencies\n\
- COMPLEX: Multiple steps, heavy context, multiple dependencies";

#[must_use]
pub fn analysis_prompt(task: &str) -> String {
    ANALYSIS_TEMPLATE.replace("{task}", task)
}

/// Asks `model` to classify `task` as `SIMPLE | MODERATE | COMPLEX`. A
/// malformed reply defaults to `Moderate` (spec §4.7 step 1).
pub async fn analyze_complexity(pool: &Pool, model: &str, task: &str) -> Result<Complexity> {
    let req = hydra_core::request::Request::new(analysis_prompt(task)).with_model(model.to_string());
    let response = pool.generate(&req).await?;
    Ok(parse_complexity(&response.text))
}

fn parse_complexity(text: &str) -> Complexity {
    match text.trim().to_uppercase().as_str() {
        "SIMPLE" => Complexity::Simple,
        "COMPLEX" => Complexity::Complex,
        "MODERATE" => Complexity::Moderate,
        other => {
            warn!(reply = other, "unrecognized complexity label, defaulting to moderate");
            Complexity::Moderate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_exact_labels_case_insensitively() {
        assert_eq!(parse_complexity("simple"), Complexity::Simple);
        assert_eq!(parse_complexity("COMPLEX"), Complexity::Complex);
        assert_eq!(parse_complexity("  Moderate  "), Complexity::Moderate);
    }

    #[test]
    fn malformed_reply_defaults_to_moderate() {
        assert_eq!(parse_complexity("I think this is quite hard"), Complexity::Moderate);
    }
}
