//! Reasoning Engine (spec §4.8): mode/style selection, prompt templates,
//! thinking extraction, self-critique, and streamed thinking/response
//! classification. Grounded on `core/reasoning_engine.py` in
//! `original_source/`, re-expressed over the Pool Facade instead of a
//! Python load balancer.

pub mod markers;
pub mod prompts;

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use hydra_core::config::HydraConfig;
use hydra_core::event::Event;
use hydra_core::reasoning::{ComplexityAxes, ReasoningMode, ReasoningRecord, ReasoningStyle};
use hydra_core::request::{GenerationOptions, Request};
use hydra_core::Result;
use hydra_pool::Pool;
use tracing::{debug, info, warn};

/// Per-call context: prior conversational context text and an optional
/// style override (defaults to chain-of-thought).
#[derive(Debug, Clone, Default)]
pub struct ReasoningContext {
    pub context_text: Option<String>,
    pub style: Option<ReasoningStyle>,
}

pub struct ReasoningEngine {
    pool: Arc<Pool>,
    config: HydraConfig,
}

impl ReasoningEngine {
    #[must_use]
    pub fn new(pool: Arc<Pool>, config: HydraConfig) -> Self {
        Self { pool, config }
    }

    fn fast_model(&self) -> &str {
        &self.config.light_model
    }

    fn standard_model(&self) -> &str {
        &self.config.heavy_model
    }

    fn reasoning_model(&self) -> &str {
        if self.config.use_reasoning_model {
            self.config.reasoning_models.first().map(String::as_str).unwrap_or(self.config.heavy_model.as_str())
        } else {
            &self.config.heavy_model
        }
    }

    async fn call(&self, model: &str, prompt: &str, max_tokens: Option<u32>) -> Result<String> {
        let options = GenerationOptions {
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            repeat_penalty: self.config.repeat_penalty,
            max_tokens,
            keep_alive: None,
        };
        let mut req = Request::new(prompt).with_model(model.to_string());
        req.options = options;
        let response = self.pool.generate(&req).await?;
        Ok(response.text)
    }

    /// Rates the task on four axes via the fast model and selects a mode
    /// (spec §4.8 "Auto selection"). Parse failure defaults to `standard`.
    pub async fn auto_select_mode(&self, task: &str) -> ReasoningMode {
        let prompt = prompts::task_complexity_analysis(task);
        let text = match self.call(self.fast_model(), &prompt, Some(200)).await {
            Ok(t) => t,
            Err(err) => {
                warn!(%err, "complexity analysis call failed, defaulting to standard");
                return ReasoningMode::Standard;
            }
        };
        match parse_axes(&text) {
            Some(axes) => {
                let mode = hydra_core::reasoning::select_mode_from_axes(axes, self.config.deep_thinking_threshold);
                info!(?mode, average = axes.average(), "auto-selected reasoning mode");
                mode
            }
            None => {
                warn!("complexity analysis parse failure, defaulting to standard");
                ReasoningMode::Standard
            }
        }
    }

    /// `reason(task, ctx, mode?) -> ReasoningRecord` (spec §6).
    pub async fn reason(&self, task: &str, ctx: ReasoningContext, mode: Option<ReasoningMode>) -> Result<ReasoningRecord> {
        let requested = mode.unwrap_or_default();
        let resolved = match requested {
            ReasoningMode::Auto => self.auto_select_mode(task).await,
            other => other,
        };
        let style = ctx.style.unwrap_or(ReasoningStyle::ChainOfThought);

        match resolved {
            ReasoningMode::Fast => self.reason_fast(task, &ctx).await,
            ReasoningMode::Standard => self.reason_standard(task, &ctx).await,
            ReasoningMode::Extended => self.reason_extended(task, &ctx, style).await,
            ReasoningMode::Deep => self.reason_deep(task, &ctx).await,
            ReasoningMode::Auto => unreachable!("auto is resolved above"),
        }
    }

    async fn reason_fast(&self, task: &str, ctx: &ReasoningContext) -> Result<ReasoningRecord> {
        let prompt = match &ctx.context_text {
            Some(c) => format!("{task}\n\n{c}"),
            None => task.to_string(),
        };
        let text = self.call(self.fast_model(), &prompt, None).await?;
        Ok(ReasoningRecord {
            mode: ReasoningMode::Fast,
            style: ReasoningStyle::ChainOfThought,
            thinking_budget: 0,
            critique_iterations: 0,
            thinking_text: String::new(),
            response_text: text,
            model_used: self.fast_model().to_string(),
        })
    }

    async fn reason_standard(&self, task: &str, ctx: &ReasoningContext) -> Result<ReasoningRecord> {
        let prompt = prompts::chain_of_thought(task, ctx.context_text.as_deref());
        let text = self.call(self.standard_model(), &prompt, Some(self.config.max_thinking_tokens)).await?;
        let (thinking, response) = markers::extract_thinking(&text);
        let thinking = thinking.unwrap_or_default();
        Ok(ReasoningRecord {
            mode: ReasoningMode::Standard,
            style: ReasoningStyle::ChainOfThought,
            thinking_budget: word_count(&thinking),
            critique_iterations: 0,
            thinking_text: thinking,
            response_text: response,
            model_used: self.standard_model().to_string(),
        })
    }

    async fn reason_extended(&self, task: &str, ctx: &ReasoningContext, style: ReasoningStyle) -> Result<ReasoningRecord> {
        let model = self.reasoning_model().to_string();
        let prompt = match style {
            ReasoningStyle::TreeOfThought => prompts::tree_of_thought(task, 3),
            _ => prompts::extended_thinking(task, ctx.context_text.as_deref()),
        };
        debug!(%model, "extended reasoning");
        let text = self.call(&model, &prompt, Some(self.config.max_thinking_tokens)).await?;
        let (thinking, mut response) = markers::extract_thinking(&text);
        let mut thinking = thinking.unwrap_or_default();

        let mut critique_iterations = 0;
        if style == ReasoningStyle::SelfCritique {
            for iteration in 1..=self.config.max_critique_iterations {
                let critique_prompt = prompts::self_critique(&response, task);
                let critique_text = self.call(&model, &critique_prompt, None).await?;
                let (critique_thinking, improved) = markers::extract_thinking(&critique_text);
                if let Some(ct) = critique_thinking {
                    thinking = format!("{thinking}\n\n[Critique {iteration}]\n{ct}");
                }
                response = improved;
                critique_iterations += 1;
            }
        }

        Ok(ReasoningRecord {
            mode: ReasoningMode::Extended,
            style,
            thinking_budget: word_count(&thinking),
            critique_iterations,
            thinking_text: thinking,
            response_text: response,
            model_used: model,
        })
    }

    async fn reason_deep(&self, task: &str, ctx: &ReasoningContext) -> Result<ReasoningRecord> {
        let model = self.reasoning_model().to_string();
        let prompt = prompts::deep_thinking(task, ctx.context_text.as_deref());
        info!(%model, budget = self.config.deep_thinking_tokens, "deep thinking");
        let text = self.call(&model, &prompt, Some(self.config.deep_thinking_tokens)).await?;
        let (thinking, mut response) = markers::extract_thinking(&text);
        let mut thinking = thinking.unwrap_or_default();

        for iteration in 1..=self.config.deep_thinking_iterations {
            let critique_prompt = prompts::self_critique(&response, task);
            let critique_text = self.call(&model, &critique_prompt, Some(self.config.deep_thinking_tokens)).await?;
            let (critique_thinking, improved) = markers::extract_thinking(&critique_text);
            if let Some(ct) = critique_thinking {
                thinking = format!("{thinking}\n\n[Deep Critique {iteration}]\n{ct}");
            }
            response = improved;
        }

        Ok(ReasoningRecord {
            mode: ReasoningMode::Deep,
            style: ReasoningStyle::SelfCritique,
            thinking_budget: word_count(&thinking),
            critique_iterations: self.config.deep_thinking_iterations,
            thinking_text: thinking,
            response_text: response,
            model_used: model,
        })
    }

    /// `reason_stream(task, ctx, mode?) -> event stream` (spec §4.8
    /// "Streaming"). Emits a `Metadata` event announcing the resolved
    /// mode/model, then classifies each chunk as `Thinking` or `Chunk`
    /// depending on whether the running buffer is inside a thinking
    /// marker. Only the initial generation pass is streamed; self-critique
    /// passes run only in [`ReasoningEngine::reason`].
    pub async fn reason_stream(
        &self,
        task: String,
        ctx: ReasoningContext,
        mode: Option<ReasoningMode>,
    ) -> Result<Pin<Box<dyn Stream<Item = Event> + Send>>> {
        let requested = mode.unwrap_or_default();
        let resolved = match requested {
            ReasoningMode::Auto => self.auto_select_mode(&task).await,
            other => other,
        };
        let style = ctx.style.unwrap_or(ReasoningStyle::ChainOfThought);

        let (model, prompt, max_tokens) = match resolved {
            ReasoningMode::Fast => (
                self.fast_model().to_string(),
                match &ctx.context_text {
                    Some(c) => format!("{task}\n\n{c}"),
                    None => task.clone(),
                },
                None,
            ),
            ReasoningMode::Standard => (
                self.standard_model().to_string(),
                prompts::chain_of_thought(&task, ctx.context_text.as_deref()),
                Some(self.config.max_thinking_tokens),
            ),
            ReasoningMode::Extended => {
                let prompt = match style {
                    ReasoningStyle::TreeOfThought => prompts::tree_of_thought(&task, 3),
                    _ => prompts::extended_thinking(&task, ctx.context_text.as_deref()),
                };
                (self.reasoning_model().to_string(), prompt, Some(self.config.max_thinking_tokens))
            }
            ReasoningMode::Deep => (
                self.reasoning_model().to_string(),
                prompts::deep_thinking(&task, ctx.context_text.as_deref()),
                Some(self.config.deep_thinking_tokens),
            ),
            ReasoningMode::Auto => unreachable!("auto is resolved above"),
        };

        let options = GenerationOptions {
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            repeat_penalty: self.config.repeat_penalty,
            max_tokens,
            keep_alive: None,
        };
        let mut req = Request::new(prompt).with_model(model.clone());
        req.options = options;

        let inner = self.pool.generate_stream(req).await?;
        let metadata = Event::Metadata {
            info: serde_json::json!({"mode": resolved, "model": model}),
        };

        let s = async_stream::stream! {
            yield metadata;
            let mut in_thinking = false;
            futures::pin_mut!(inner);
            while let Some(event) = inner.next().await {
                match event {
                    Event::Chunk { text } => {
                        if markers::opens_thinking(&text) {
                            in_thinking = true;
                        }
                        let is_thinking = in_thinking;
                        if markers::closes_thinking(&text) {
                            in_thinking = false;
                        }
                        if is_thinking {
                            yield Event::Thinking { text };
                        } else {
                            yield Event::Chunk { text };
                        }
                    }
                    other => yield other,
                }
            }
        };

        Ok(Box::pin(s))
    }
}

fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Extracts the first well-formed JSON object from `text` and parses the
/// four complexity axes. Tolerant of surrounding prose, since models don't
/// always respond with JSON only.
fn parse_axes(text: &str) -> Option<ComplexityAxes> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &text[start..=end];
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;
    Some(ComplexityAxes {
        complexity: value.get("complexity")?.as_f64()?,
        ambiguity: value.get("ambiguity")?.as_f64()?,
        novelty: value.get("novelty")?.as_f64()?,
        risk: value.get("risk")?.as_f64()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complexity_json_embedded_in_prose() {
        let text = "Here is my analysis:\n{\"complexity\": 9, \"ambiguity\": 8, \"novelty\": 7, \"risk\": 9}\nThanks.";
        let axes = parse_axes(text).unwrap();
        assert!((axes.complexity - 9.0).abs() < 1e-9);
        assert!((axes.risk - 9.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_json_yields_none() {
        assert!(parse_axes("not json at all").is_none());
    }

    #[test]
    fn word_count_counts_whitespace_separated_tokens() {
        assert_eq!(word_count("one two three"), 3);
        assert_eq!(word_count(""), 0);
    }
}
