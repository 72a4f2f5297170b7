//! Orchestrator (spec §4.7): complexity analysis, decomposition, parallel
//! fan-out, and weighted-voting synthesis. Grounded on
//! `core/orchestrator.py` in `original_source/`, re-expressed over the
//! Pool Facade; the fan-out/synthesis split mirrors
//! `dashflow-chains::combine_documents::map_reduce`'s map-then-reduce
//! shape.

pub mod complexity;
pub mod decompose;
pub mod fanout;
pub mod synthesis;

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use hydra_core::config::HydraConfig;
use hydra_core::event::Event;
use hydra_core::task::{Category, Complexity, Task};
use hydra_core::{Error, Result};
use hydra_pool::Pool;
use tracing::info;

/// Result of a complete, non-streamed orchestration run.
#[derive(Debug, Clone)]
pub struct OrchestrationResult {
    pub task: Task,
    pub response: String,
    pub confidence: f64,
    pub explanations: Vec<String>,
}

pub struct Orchestrator {
    pool: Arc<Pool>,
    config: HydraConfig,
}

impl Orchestrator {
    #[must_use]
    pub fn new(pool: Arc<Pool>, config: HydraConfig) -> Self {
        Self { pool, config }
    }

    fn decompose_model(&self, complexity: Complexity) -> &str {
        if complexity == Complexity::Complex {
            &self.config.heavy_model
        } else {
            &self.config.light_model
        }
    }

    /// Runs the full pipeline: analyze, decompose (skipped for `Simple`
    /// tasks), fan out, and synthesize (spec §4.7 steps 1-5).
    pub async fn orchestrate(&self, prompt: &str) -> Result<OrchestrationResult> {
        let complexity = complexity::analyze_complexity(&self.pool, &self.config.light_model, prompt).await?;
        let mut task = Task::new(prompt, complexity);
        info!(?complexity, "task complexity analyzed");

        if complexity == Complexity::Simple {
            let models = fanout::candidate_models(&self.config, Category::General);
            let model = models.first().cloned().unwrap_or_else(|| self.config.light_model.clone());
            let req = hydra_core::request::Request::new(prompt.to_string()).with_model(model);
            let response = self.pool.generate(&req).await?;
            return Ok(OrchestrationResult {
                task,
                response: response.text,
                confidence: 1.0,
                explanations: Vec::new(),
            });
        }

        task.subtasks = decompose::decompose(&self.pool, self.decompose_model(complexity), prompt).await?;
        task.results = fanout::execute_layered(&self.pool, &self.config, &task).await;

        if task.results.is_empty() {
            return Err(Error::resource_exhausted(
                "every subtask failed on every candidate model; nothing to synthesize",
            ));
        }

        let synthesized = synthesis::synthesize(&task.results, &self.config.model_weights);
        Ok(OrchestrationResult {
            task,
            response: synthesized.code,
            confidence: synthesized.confidence,
            explanations: synthesized.explanations,
        })
    }

    /// Streaming variant (spec §4.7 step 5 edge case): `Simple` tasks
    /// stream directly from the chosen model; complex tasks run
    /// decomposition and fan-out unstreamed, then stream only the final
    /// synthesis response.
    pub async fn orchestrate_stream(
        &self,
        prompt: String,
    ) -> Result<Pin<Box<dyn Stream<Item = Event> + Send>>> {
        let complexity = complexity::analyze_complexity(&self.pool, &self.config.light_model, &prompt).await?;

        if complexity == Complexity::Simple {
            let models = fanout::candidate_models(&self.config, Category::General);
            let model = models.first().cloned().unwrap_or_else(|| self.config.light_model.clone());
            let req = hydra_core::request::Request::new(prompt).with_model(model.clone());
            let inner = self.pool.generate_stream(req).await?;
            let metadata = Event::Metadata { info: serde_json::json!({ "model": model }) };
            let s = async_stream::stream! {
                yield metadata;
                futures::pin_mut!(inner);
                while let Some(event) = inner.next().await {
                    yield event;
                }
            };
            return Ok(Box::pin(s));
        }

        let mut task = Task::new(prompt.clone(), complexity);
        task.subtasks = decompose::decompose(&self.pool, self.decompose_model(complexity), &prompt).await?;
        task.results = fanout::execute_layered(&self.pool, &self.config, &task).await;

        if task.results.is_empty() {
            return Err(Error::resource_exhausted(
                "every subtask failed on every candidate model; nothing to synthesize",
            ));
        }

        let synthesized = synthesis::synthesize(&task.results, &self.config.model_weights);
        let model = self.decompose_model(complexity).to_string();
        let synth_prompt =
            format!("Here is a merged candidate solution, refine it into a final answer:\n\n{}", synthesized.code);
        let req = hydra_core::request::Request::new(synth_prompt).with_model(model.clone());
        let inner = self.pool.generate_stream(req).await?;
        let metadata =
            Event::Metadata { info: serde_json::json!({ "model": model, "synthesis_confidence": synthesized.confidence }) };
        let s = async_stream::stream! {
            yield metadata;
            futures::pin_mut!(inner);
            while let Some(event) = inner.next().await {
                yield event;
            }
        };
        Ok(Box::pin(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_model_uses_heavy_for_complex_tasks() {
        let config = HydraConfig::default();
        let pool = Arc::new(Pool::new(
            Arc::new(hydra_registry::NodeRegistry::new()),
            hydra_pool::PoolConfig::default(),
        ));
        let orchestrator = Orchestrator::new(pool, config.clone());
        assert_eq!(orchestrator.decompose_model(Complexity::Complex), config.heavy_model);
        assert_eq!(orchestrator.decompose_model(Complexity::Moderate), config.light_model);
    }
}
