//! Decomposition into dependency-respecting subtasks (spec §4.7 step 2).

use hydra_core::task::{Category, SubTask, SubTaskId};
use hydra_core::Result;
use hydra_pool::Pool;
use serde::Deserialize;
use tracing::warn;

const DECOMPOSE_TEMPLATE: &str = "Break this task into independent subtasks that can be solved in parallel. \
Respond with a JSON array only, no prose, in this shape:\n\
[{\"subtask\": \"...\", \"model_type\": \"code|reasoning|math|general\", \"dependencies\": []}]\n\n\
Task: {task}";

#[derive(Debug, Deserialize)]
struct RawSubTask {
    subtask: String,
    #[serde(default)]
    model_type: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

#[must_use]
pub fn decompose_prompt(task: &str) -> String {
    DECOMPOSE_TEMPLATE.replace("{task}", task)
}

/// Asks `model` to split `task` into subtasks. A malformed or empty reply
/// falls back to a single subtask covering the whole task (spec §4.7 step
/// 2 edge case).
pub async fn decompose(pool: &Pool, model: &str, task: &str) -> Result<Vec<SubTask>> {
    let req = hydra_core::request::Request::new(decompose_prompt(task)).with_model(model.to_string());
    let response = pool.generate(&req).await?;
    Ok(parse_subtasks(&response.text).unwrap_or_else(|| vec![fallback_subtask(task)]))
}

fn fallback_subtask(task: &str) -> SubTask {
    SubTask {
        id: SubTaskId("0".to_string()),
        prompt: task.to_string(),
        category: Category::General,
        dependencies: Vec::new(),
    }
}

fn parse_subtasks(text: &str) -> Option<Vec<SubTask>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    let raw: Vec<RawSubTask> = serde_json::from_str(&text[start..=end]).ok()?;
    if raw.is_empty() {
        return None;
    }
    Some(
        raw.into_iter()
            .enumerate()
            .map(|(index, item)| SubTask {
                id: SubTaskId(index.to_string()),
                prompt: item.subtask,
                category: parse_category(&item.model_type),
                dependencies: item.dependencies.into_iter().map(SubTaskId).collect(),
            })
            .collect(),
    )
}

fn parse_category(label: &str) -> Category {
    match label.to_lowercase().as_str() {
        "code" => Category::Code,
        "reasoning" => Category::Reasoning,
        "math" => Category::Math,
        other => {
            if !other.is_empty() {
                warn!(label = other, "unrecognized subtask model_type, defaulting to general");
            }
            Category::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_subtask_array() {
        let text = r#"Sure, here you go:
[{"subtask": "design the schema", "model_type": "reasoning", "dependencies": []},
 {"subtask": "implement it", "model_type": "code", "dependencies": ["0"]}]"#;
        let subtasks = parse_subtasks(text).unwrap();
        assert_eq!(subtasks.len(), 2);
        assert_eq!(subtasks[0].category, Category::Reasoning);
        assert_eq!(subtasks[1].dependencies, vec![SubTaskId("0".to_string())]);
    }

    #[test]
    fn malformed_reply_yields_none() {
        assert!(parse_subtasks("not json at all").is_none());
    }

    #[test]
    fn empty_array_yields_none_so_fallback_applies() {
        assert!(parse_subtasks("[]").is_none());
    }
}
