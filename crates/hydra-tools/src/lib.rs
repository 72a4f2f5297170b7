//! Tool Registry & Approval Tracker (spec §4.10).

pub mod approval;
pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hydra_core::tool::{Permission, ToolDescriptor};
use hydra_core::Result;
use serde_json::Value;

pub use approval::{hash_call, normalize_args, ApprovalTracker};

/// One invocable tool. The registry holds these as trait objects so the
/// Agent loop and Orchestrator never depend on a concrete tool type (spec
/// §9 design note on capability interfaces).
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;
    async fn call(&self, args: Value) -> Result<Value>;
}

/// Capability a version-controlled workspace supplies to critical,
/// file-mutating tools (spec §4.10 "Hydra branch"): generate a diff and
/// apply the change on an isolated feature branch. `hydra-tools-git`
/// implements this; `hydra-tools` never depends on it directly.
pub trait VersionControl: Send + Sync {
    fn is_vcs_workspace(&self, path: &std::path::Path) -> bool;
    fn create_feature_branch(&self, prefix: &str) -> Result<String>;
    fn diff(&self, path: &std::path::Path) -> Result<String>;
}

/// Registry of named tools plus the shared [`ApprovalTracker`] gating
/// `requires_approval`/`critical` invocations.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    tracker: ApprovalTracker,
    vcs: Option<Arc<dyn VersionControl>>,
}

/// The outcome of one dispatched tool call (spec §3 "Agent Step" `ToolResult`).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolCallOutcome {
    pub tool_name: String,
    pub approved: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
            tracker: ApprovalTracker::new(),
            vcs: None,
        };
        registry.register(Arc::new(builtin::ReadFileTool));
        registry.register(Arc::new(builtin::ListDirectoryTool));
        registry.register(Arc::new(builtin::SearchCodebaseTool));
        registry.register(Arc::new(builtin::AnalyzeCodeTool));
        registry.register(Arc::new(builtin::ReadLinesTool));
        registry.register(Arc::new(builtin::ExecutePythonTool));
        registry.register(Arc::new(builtin::WriteFileTool));
        registry.register(Arc::new(builtin::InsertLinesTool));
        registry.register(Arc::new(builtin::DeleteLinesTool));
        registry.register(Arc::new(builtin::ReplaceLinesTool));
        registry.register(Arc::new(builtin::AppendToFileTool));
        registry.register(Arc::new(builtin::RunCommandTool {
            allowed_commands: Vec::new(),
        }));
        registry
    }

    #[must_use]
    pub fn with_version_control(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.descriptor().name, tool);
    }

    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> = self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    #[must_use]
    pub fn tracker(&self) -> &ApprovalTracker {
        &self.tracker
    }

    const CRITICAL_FILE_TOOLS: [&'static str; 5] =
        ["write_file", "insert_lines", "delete_lines", "replace_lines", "append_to_file"];

    /// Dispatches `tool_name(args)` through the approval gate (spec §4.10,
    /// §8 "Approval monotonicity"). Critical file-mutating tools first
    /// capture a diff and isolate the change on a feature branch when a
    /// VCS workspace is detected.
    pub async fn call(&self, tool_name: &str, args: Value) -> ToolCallOutcome {
        let Some(tool) = self.tools.get(tool_name) else {
            return ToolCallOutcome {
                tool_name: tool_name.to_string(),
                approved: false,
                output: None,
                error: Some(format!("unknown tool `{tool_name}`")),
            };
        };
        let descriptor = tool.descriptor();

        if !self.tracker.is_approved(tool_name, &args, descriptor.permission) {
            return ToolCallOutcome {
                tool_name: tool_name.to_string(),
                approved: false,
                output: None,
                error: Some(format!("{tool_name} requires approval")),
            };
        }

        let mut diff = None;
        if descriptor.permission == Permission::RequiresApproval {
            self.tracker.record_approval(tool_name, &args, true);
        }
        if Self::CRITICAL_FILE_TOOLS.contains(&tool_name) {
            if let (Some(vcs), Some(path)) = (&self.vcs, args.get("path").and_then(Value::as_str)) {
                let path = std::path::Path::new(path);
                if vcs.is_vcs_workspace(path) {
                    if let Ok(branch) = vcs.create_feature_branch("hydra") {
                        tracing::debug!(branch, tool_name, "isolating critical change on feature branch");
                    }
                    diff = vcs.diff(path).ok();
                }
            }
        }

        match tool.call(args).await {
            Ok(mut output) => {
                if let (Some(diff), Value::Object(ref mut map)) = (diff, &mut output) {
                    map.insert("diff".to_string(), Value::String(diff));
                }
                ToolCallOutcome {
                    tool_name: tool_name.to_string(),
                    approved: true,
                    output: Some(output),
                    error: None,
                }
            }
            Err(err) => ToolCallOutcome {
                tool_name: tool_name.to_string(),
                approved: true,
                output: None,
                error: Some(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn safe_tool_runs_without_approval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        tokio::fs::write(&path, "hi").await.unwrap();
        let registry = ToolRegistry::new();
        let outcome = registry.call("read_file", json!({"path": path.to_string_lossy()})).await;
        assert!(outcome.approved);
        assert_eq!(outcome.output, Some(json!("hi")));
    }

    #[tokio::test]
    async fn critical_tool_is_refused_without_approval() {
        let registry = ToolRegistry::new();
        let outcome = registry.call("write_file", json!({"path": "x", "content": "y"})).await;
        assert!(!outcome.approved);
        assert!(outcome.error.is_some());
    }

    struct FakeVcs;

    impl VersionControl for FakeVcs {
        fn is_vcs_workspace(&self, _path: &std::path::Path) -> bool {
            true
        }
        fn create_feature_branch(&self, prefix: &str) -> Result<String> {
            Ok(format!("{prefix}/test"))
        }
        fn diff(&self, _path: &std::path::Path) -> Result<String> {
            Ok("--- a/x\n+++ b/x\n".to_string())
        }
    }

    #[tokio::test]
    async fn critical_tool_runs_and_isolates_on_a_feature_branch_once_approved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.txt");
        let registry = ToolRegistry::new().with_version_control(Arc::new(FakeVcs));
        let args = json!({"path": path.to_string_lossy(), "content": "y"});

        registry.tracker().record_approval("write_file", &args, false);
        let outcome = registry.call("write_file", args).await;

        assert!(outcome.approved);
        assert!(outcome.error.is_none());
        let output = outcome.output.unwrap();
        assert_eq!(output.get("diff").and_then(Value::as_str), Some("--- a/x\n+++ b/x\n"));
    }

    #[tokio::test]
    async fn list_tools_reports_every_built_in() {
        let registry = ToolRegistry::new();
        let names: Vec<String> = registry.list_tools().into_iter().map(|d| d.name).collect();
        assert!(names.contains(&"read_file".to_string()));
        assert!(names.contains(&"run_command".to_string()));
        assert_eq!(names.len(), 11);
    }
}
