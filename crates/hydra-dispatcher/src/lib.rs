//! Code Task Dispatcher (spec §4.6): classifies an incoming request into a
//! [`TaskType`] via weighted keyword matching plus context bonuses, and
//! hands back an ordered, config-overridable preferred-model chain.

use std::collections::HashMap;

use hydra_core::task::TaskType;
use hydra_pool::FallbackProvider;

/// One classifier input: the prompt plus whatever the caller already knows
/// about the surrounding code (spec §4.6 "presence of existing code").
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    pub has_error_context: bool,
    pub has_traceback: bool,
    pub has_existing_code: bool,
}

fn keywords_for(task_type: TaskType) -> &'static [&'static str] {
    match task_type {
        TaskType::Generate => &[
            "write", "create", "implement", "build", "make", "develop", "code", "function",
            "class", "module", "script", "program",
        ],
        TaskType::Debug => &[
            "debug", "fix", "error", "bug", "broken", "crash", "exception", "not working",
            "doesn't work", "issue", "problem", "fault",
        ],
        TaskType::Explain => &[
            "explain", "describe", "what", "how", "why", "understand", "clarify", "means",
            "does", "purpose", "walkthrough",
        ],
        TaskType::Troubleshoot => &[
            "troubleshoot", "diagnose", "investigate", "analyze error", "root cause", "why is",
            "figure out", "identify issue",
        ],
        TaskType::Refactor => &[
            "refactor", "improve", "clean", "reorganize", "restructure", "simplify", "better",
            "cleaner", "more efficient", "redesign",
        ],
        TaskType::Review => &[
            "review", "check", "audit", "evaluate", "assess", "critique", "feedback",
            "suggestions", "improvements",
        ],
        TaskType::Optimize => &[
            "optimize", "performance", "faster", "speed up", "efficient", "reduce memory",
            "complexity", "bottleneck", "slow",
        ],
        TaskType::Test => &[
            "test", "unit test", "testing", "test case", "coverage", "pytest", "unittest",
            "mock", "assertion",
        ],
        TaskType::Document => &[
            "document", "documentation", "docstring", "comment", "annotate", "readme",
            "api docs", "usage", "examples",
        ],
    }
}

const ALL_TASK_TYPES: [TaskType; 9] = [
    TaskType::Generate,
    TaskType::Debug,
    TaskType::Explain,
    TaskType::Troubleshoot,
    TaskType::Refactor,
    TaskType::Review,
    TaskType::Optimize,
    TaskType::Test,
    TaskType::Document,
];

/// Classifies `prompt` into a [`TaskType`] (spec §4.6). Ties, including an
/// all-zero score, default to `Generate`.
#[must_use]
pub fn detect_task_type(prompt: &str, ctx: &DispatchContext) -> TaskType {
    let prompt_lower = prompt.to_lowercase();
    let mut scores: HashMap<TaskType, i32> = ALL_TASK_TYPES
        .iter()
        .map(|t| {
            let score = keywords_for(*t)
                .iter()
                .filter(|kw| prompt_lower.contains(*kw))
                .count() as i32;
            (*t, score)
        })
        .collect();

    if ctx.has_error_context || ctx.has_traceback || prompt_lower.contains("exception") {
        *scores.get_mut(&TaskType::Debug).unwrap() += 3;
        *scores.get_mut(&TaskType::Troubleshoot).unwrap() += 2;
    }

    if ["what is", "how does", "explain"].iter().any(|p| prompt_lower.contains(p)) {
        *scores.get_mut(&TaskType::Explain).unwrap() += 3;
    }

    if ctx.has_existing_code && !["write", "create", "implement"].iter().any(|w| prompt_lower.contains(w)) {
        if prompt_lower.contains("improve") || prompt_lower.contains("better") {
            *scores.get_mut(&TaskType::Refactor).unwrap() += 2;
        } else if prompt_lower.contains("performance") || prompt_lower.contains("slow") {
            *scores.get_mut(&TaskType::Optimize).unwrap() += 2;
        }
    }

    let (best_type, best_score) = ALL_TASK_TYPES
        .iter()
        .map(|t| (*t, scores[t]))
        .max_by_key(|(_, score)| *score)
        .expect("ALL_TASK_TYPES is non-empty");

    if best_score > 0 {
        best_type
    } else {
        TaskType::Generate
    }
}

/// Default small-to-large preferred-model chain per task type, all 7B and
/// smaller so every chain works on both GPU and CPU nodes. Overridable via
/// [`ModelChains::with_override`] from configuration.
#[must_use]
pub fn default_model_chains() -> HashMap<TaskType, Vec<String>> {
    let s = |v: &[&str]| v.iter().map(|m| m.to_string()).collect();
    HashMap::from([
        (TaskType::Generate, s(&["qwen2.5-coder:7b", "deepseek-coder:latest", "codellama:latest"])),
        (TaskType::Debug, s(&["qwen2.5-coder:7b", "deepseek-coder:latest", "llama3.2:latest"])),
        (TaskType::Explain, s(&["llama3.2:latest", "mistral:latest", "qwen2.5-coder:3b"])),
        (TaskType::Troubleshoot, s(&["qwen2.5-coder:7b", "llama3.2:latest"])),
        (TaskType::Refactor, s(&["qwen2.5-coder:7b", "codellama:latest"])),
        (TaskType::Review, s(&["qwen2.5-coder:7b", "llama3.2:latest"])),
        (TaskType::Optimize, s(&["qwen2.5-coder:7b", "deepseek-coder:latest"])),
        (TaskType::Test, s(&["qwen2.5-coder:7b", "qwen2.5-coder:3b"])),
        (TaskType::Document, s(&["llama3.2:latest", "mistral:latest"])),
    ])
}

/// Per-task-type preferred model chains, defaulted from
/// [`default_model_chains`] and overridable entry-by-entry from
/// `HydraConfig` (spec §4.6 "overridable from configuration").
#[derive(Debug, Clone)]
pub struct ModelChains {
    chains: HashMap<TaskType, Vec<String>>,
}

impl Default for ModelChains {
    fn default() -> Self {
        Self {
            chains: default_model_chains(),
        }
    }
}

impl ModelChains {
    #[must_use]
    pub fn with_override(mut self, task_type: TaskType, chain: Vec<String>) -> Self {
        self.chains.insert(task_type, chain);
        self
    }

    #[must_use]
    pub fn chain_for(&self, task_type: TaskType) -> &[String] {
        self.chains.get(&task_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The model to try first for `task_type`.
    #[must_use]
    pub fn preferred_model(&self, task_type: TaskType) -> Option<&str> {
        self.chain_for(task_type).first().map(String::as_str)
    }
}

/// Adapts a [`ModelChains`] + [`TaskType`] pair into the [`FallbackProvider`]
/// capability `hydra-pool` consumes on an OOM indicator, without `hydra-pool`
/// depending on this crate (spec §9 design note).
#[derive(Debug, Clone)]
pub struct DispatcherFallback {
    chain: Vec<String>,
}

impl DispatcherFallback {
    #[must_use]
    pub fn for_task(chains: &ModelChains, task_type: TaskType) -> Self {
        Self {
            chain: chains.chain_for(task_type).to_vec(),
        }
    }
}

impl FallbackProvider for DispatcherFallback {
    fn smaller_model(&self, current_model: &str) -> Option<String> {
        let pos = self.chain.iter().position(|m| m == current_model)?;
        self.chain.get(pos + 1).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_keywords_outscore_generate() {
        let ctx = DispatchContext::default();
        assert_eq!(detect_task_type("fix this bug, it's broken", &ctx), TaskType::Debug);
    }

    #[test]
    fn error_context_biases_toward_debug() {
        let ctx = DispatchContext {
            has_error_context: true,
            ..Default::default()
        };
        assert_eq!(detect_task_type("what happened here", &ctx), TaskType::Debug);
    }

    #[test]
    fn existing_code_plus_improve_biases_refactor() {
        let ctx = DispatchContext {
            has_existing_code: true,
            ..Default::default()
        };
        assert_eq!(detect_task_type("can you improve this?", &ctx), TaskType::Refactor);
    }

    #[test]
    fn zero_score_defaults_to_generate() {
        let ctx = DispatchContext::default();
        assert_eq!(detect_task_type("xyzzy plugh", &ctx), TaskType::Generate);
    }

    #[test]
    fn fallback_provider_steps_down_the_chain() {
        let chains = ModelChains::default();
        let fallback = DispatcherFallback::for_task(&chains, TaskType::Generate);
        assert_eq!(
            fallback.smaller_model("qwen2.5-coder:7b"),
            Some("deepseek-coder:latest".to_string())
        );
        assert_eq!(fallback.smaller_model("codellama:latest"), None);
    }
}
