//! Parallel fan-out over candidate models, and dependency-respecting
//! layered execution of a task's subtasks (spec §4.7 step 3, §8 "Fan-out
//! completeness"). Grounded on the map step of
//! `dashflow-chains::combine_documents::map_reduce`, which runs one call
//! per input document via `futures::future::join_all` and tolerates
//! individual failures.

use futures::future::join_all;
use hydra_core::config::HydraConfig;
use hydra_core::task::{Category, SubTask, SubTaskId, SubTaskResult, Task};
use hydra_pool::Pool;
use tracing::error;

const MAX_CANDIDATE_MODELS: usize = 5;

/// Candidate models for a subtask's category, per spec §4.7 step 3.
#[must_use]
pub fn candidate_models(config: &HydraConfig, category: Category) -> Vec<String> {
    let pool = match category {
        Category::Code => &config.code_models,
        Category::Reasoning => &config.reasoning_models,
        Category::Math => &config.math_models,
        Category::General => &config.general_models,
    };
    pool.iter().take(MAX_CANDIDATE_MODELS).cloned().collect()
}

/// Runs `subtask.prompt` against every model in `models` concurrently.
/// A model that errors is logged and dropped, not propagated; the
/// subtask as a whole only fails if every model fails.
pub async fn fan_out(pool: &Pool, subtask: &SubTask, models: &[String]) -> Vec<SubTaskResult> {
    let calls = models.iter().map(|model| async move {
        let req = hydra_core::request::Request::new(subtask.prompt.clone()).with_model(model.clone());
        match pool.generate(&req).await {
            Ok(response) => Some(SubTaskResult {
                subtask_id: subtask.id.clone(),
                model: model.clone(),
                text: response.text,
                confidence: 1.0,
            }),
            Err(err) => {
                error!(%model, subtask_id = %subtask.id.0, error = %err, "model failed on subtask");
                None
            }
        }
    });
    join_all(calls).await.into_iter().flatten().collect()
}

/// Executes every subtask in `task` in dependency order, fanning each
/// ready layer out in parallel. Returns the accumulated results; a
/// subtask with zero successful responses contributes nothing (spec §8
/// "Fan-out completeness" — synthesis later filters these out).
pub async fn execute_layered(pool: &Pool, config: &HydraConfig, task: &Task) -> Vec<SubTaskResult> {
    let mut completed: Vec<SubTaskId> = Vec::new();
    let mut results = Vec::new();

    loop {
        let ready: Vec<SubTask> = task
            .dispatchable_subtasks(&completed)
            .into_iter()
            .filter(|st| !completed.contains(&st.id))
            .cloned()
            .collect();
        if ready.is_empty() {
            break;
        }

        let layer = join_all(ready.iter().map(|subtask| async move {
            let models = candidate_models(config, subtask.category);
            (subtask.id.clone(), fan_out(pool, subtask, &models).await)
        }))
        .await;

        for (id, subtask_results) in layer {
            completed.push(id);
            results.extend(subtask_results);
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_models_caps_at_five() {
        let mut config = HydraConfig::default();
        config.code_models = (0..10).map(|i| format!("model-{i}")).collect();
        let models = candidate_models(&config, Category::Code);
        assert_eq!(models.len(), MAX_CANDIDATE_MODELS);
    }

    #[test]
    fn candidate_models_selects_pool_by_category() {
        let mut config = HydraConfig::default();
        config.math_models = vec!["mathbot".to_string()];
        let models = candidate_models(&config, Category::Math);
        assert_eq!(models, vec!["mathbot".to_string()]);
    }
}
