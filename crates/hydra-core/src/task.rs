//! Task / SubTask data model (spec §3 "Task", §4.6 "Code Task Dispatcher").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse complexity label produced by the analyst model (spec §4.7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// The task category used to pick a fan-out model pool (spec §4.7 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Code,
    Reasoning,
    Math,
    General,
}

/// The dispatcher's classification of an incoming request (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Generate,
    Debug,
    Explain,
    Troubleshoot,
    Refactor,
    Review,
    Optimize,
    Test,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTaskId(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: SubTaskId,
    pub prompt: String,
    pub category: Category,
    pub dependencies: Vec<SubTaskId>,
}

/// A model response to one subtask, carried into synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTaskResult {
    pub subtask_id: SubTaskId,
    pub model: String,
    pub text: String,
    /// Confidence assigned to this response, defaulted to `1.0` and
    /// adjusted by synthesis-time syntax repair (spec §4.7.1).
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub prompt: String,
    pub context: HashMap<String, serde_json::Value>,
    pub complexity: Complexity,
    pub subtasks: Vec<SubTask>,
    pub results: Vec<SubTaskResult>,
}

impl Task {
    #[must_use]
    pub fn new(prompt: impl Into<String>, complexity: Complexity) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            context: HashMap::new(),
            complexity,
            subtasks: Vec::new(),
            results: Vec::new(),
        }
    }

    /// A SubTask with unmet dependencies is never dispatched (spec §3
    /// invariant). Returns the subtasks whose dependencies are all present
    /// in `completed`.
    #[must_use]
    pub fn dispatchable_subtasks<'a>(&'a self, completed: &[SubTaskId]) -> Vec<&'a SubTask> {
        self.subtasks
            .iter()
            .filter(|st| st.dependencies.iter().all(|d| completed.contains(d)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtask(id: &str, deps: &[&str]) -> SubTask {
        SubTask {
            id: SubTaskId(id.to_string()),
            prompt: format!("do {id}"),
            category: Category::Code,
            dependencies: deps.iter().map(|d| SubTaskId(d.to_string())).collect(),
        }
    }

    #[test]
    fn subtask_with_unmet_dependency_is_withheld() {
        let mut task = Task::new("build a thing", Complexity::Complex);
        task.subtasks = vec![subtask("design", &[]), subtask("implement", &["design"])];
        let ready = task.dispatchable_subtasks(&[]);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id.0, "design");
    }

    #[test]
    fn subtask_becomes_dispatchable_once_dependency_completes() {
        let mut task = Task::new("build a thing", Complexity::Complex);
        task.subtasks = vec![subtask("design", &[]), subtask("implement", &["design"])];
        let ready = task.dispatchable_subtasks(&[SubTaskId("design".to_string())]);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id.0, "implement");
    }
}
