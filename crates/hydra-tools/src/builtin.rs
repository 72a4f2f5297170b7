//! Built-in tools (spec §4.10 "minimum set").

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hydra_core::tool::{Permission, ToolDescriptor};
use hydra_core::{Error, Result};
use schemars::schema_for;
use serde::Deserialize;
use serde_json::Value;

use crate::Tool;

fn schema_for_args<T: schemars::JsonSchema>() -> schemars::Schema {
    schema_for!(T)
}

fn arg<T: for<'de> Deserialize<'de>>(args: &Value, field: &str) -> Result<T> {
    args.get(field)
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(Error::from)?
        .ok_or_else(|| Error::parse(format!("missing required argument `{field}`")))
}

#[derive(schemars::JsonSchema, Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(schemars::JsonSchema, Deserialize)]
struct ReadLinesArgs {
    path: String,
    start: usize,
    end: usize,
}

#[derive(schemars::JsonSchema, Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
}

#[derive(schemars::JsonSchema, Deserialize)]
struct InsertLinesArgs {
    path: String,
    at_line: usize,
    content: String,
}

#[derive(schemars::JsonSchema, Deserialize)]
struct DeleteLinesArgs {
    path: String,
    start: usize,
    end: usize,
}

#[derive(schemars::JsonSchema, Deserialize)]
struct ReplaceLinesArgs {
    path: String,
    start: usize,
    end: usize,
    content: String,
}

#[derive(schemars::JsonSchema, Deserialize)]
struct AppendArgs {
    path: String,
    content: String,
}

#[derive(schemars::JsonSchema, Deserialize)]
struct RunCommandArgs {
    command: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(schemars::JsonSchema, Deserialize)]
struct SearchArgs {
    root: String,
    query: String,
}

#[derive(schemars::JsonSchema, Deserialize)]
struct ExecutePythonArgs {
    code: String,
}

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "read_file".to_string(),
            description: "Reads the full contents of a text file.".to_string(),
            parameters: schema_for_args::<PathArgs>(),
            permission: Permission::Safe,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let a: PathArgs = serde_json::from_value(args).map_err(Error::from)?;
        let content = tokio::fs::read_to_string(&a.path)
            .await
            .map_err(|e| Error::parse(format!("read_file: {e}")))?;
        Ok(Value::String(content))
    }
}

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "list_directory".to_string(),
            description: "Lists immediate entries of a directory.".to_string(),
            parameters: schema_for_args::<PathArgs>(),
            permission: Permission::Safe,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let path: String = arg(&args, "path")?;
        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| Error::parse(format!("list_directory: {e}")))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(Error::from)? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(Value::Array(names.into_iter().map(Value::String).collect()))
    }
}

pub struct ReadLinesTool;

#[async_trait]
impl Tool for ReadLinesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "read_lines".to_string(),
            description: "Reads an inclusive line range `[start, end]` from a file.".to_string(),
            parameters: schema_for_args::<ReadLinesArgs>(),
            permission: Permission::Safe,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let a: ReadLinesArgs = serde_json::from_value(args).map_err(Error::from)?;
        let content = tokio::fs::read_to_string(&a.path)
            .await
            .map_err(|e| Error::parse(format!("read_lines: {e}")))?;
        let selected: Vec<&str> = content
            .lines()
            .enumerate()
            .filter(|(i, _)| *i + 1 >= a.start && *i + 1 <= a.end)
            .map(|(_, l)| l)
            .collect();
        Ok(Value::String(selected.join("\n")))
    }
}

pub struct SearchCodebaseTool;

#[async_trait]
impl Tool for SearchCodebaseTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "search_codebase".to_string(),
            description: "Greps a directory tree for a literal substring.".to_string(),
            parameters: schema_for_args::<SearchArgs>(),
            permission: Permission::Safe,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let a: SearchArgs = serde_json::from_value(args).map_err(Error::from)?;
        let mut matches = Vec::new();
        let mut stack = vec![PathBuf::from(&a.root)];
        while let Some(dir) = stack.pop() {
            let Ok(mut entries) = tokio::fs::read_dir(&dir).await else { continue };
            while let Some(entry) = entries.next_entry().await.map_err(Error::from)? {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(content) = tokio::fs::read_to_string(&path).await {
                    for (i, line) in content.lines().enumerate() {
                        if line.contains(&a.query) {
                            matches.push(format!("{}:{}: {}", path.display(), i + 1, line.trim()));
                        }
                    }
                }
            }
        }
        Ok(Value::Array(matches.into_iter().map(Value::String).collect()))
    }
}

pub struct AnalyzeCodeTool;

#[async_trait]
impl Tool for AnalyzeCodeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "analyze_code".to_string(),
            description: "Reports line/blank/comment counts for a source file.".to_string(),
            parameters: schema_for_args::<PathArgs>(),
            permission: Permission::Safe,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let path: String = arg(&args, "path")?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::parse(format!("analyze_code: {e}")))?;
        let total = content.lines().count();
        let blank = content.lines().filter(|l| l.trim().is_empty()).count();
        let comment = content
            .lines()
            .filter(|l| {
                let t = l.trim();
                t.starts_with("//") || t.starts_with('#')
            })
            .count();
        Ok(serde_json::json!({
            "total_lines": total,
            "blank_lines": blank,
            "comment_lines": comment,
        }))
    }
}

pub struct ExecutePythonTool;

#[async_trait]
impl Tool for ExecutePythonTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "execute_python".to_string(),
            description: "Runs a Python snippet in a subprocess and captures stdout.".to_string(),
            parameters: schema_for_args::<ExecutePythonArgs>(),
            permission: Permission::RequiresApproval,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let a: ExecutePythonArgs = serde_json::from_value(args).map_err(Error::from)?;
        let output = tokio::process::Command::new("python3")
            .arg("-c")
            .arg(&a.code)
            .output()
            .await
            .map_err(|e| Error::parse(format!("execute_python: {e}")))?;
        Ok(serde_json::json!({
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
            "exit_code": output.status.code(),
        }))
    }
}

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "write_file".to_string(),
            description: "Overwrites a file with the given content.".to_string(),
            parameters: schema_for_args::<WriteFileArgs>(),
            permission: Permission::Critical,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let a: WriteFileArgs = serde_json::from_value(args).map_err(Error::from)?;
        tokio::fs::write(&a.path, &a.content)
            .await
            .map_err(|e| Error::parse(format!("write_file: {e}")))?;
        Ok(serde_json::json!({"written_bytes": a.content.len()}))
    }
}

pub struct AppendToFileTool;

#[async_trait]
impl Tool for AppendToFileTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "append_to_file".to_string(),
            description: "Appends content to the end of a file.".to_string(),
            parameters: schema_for_args::<AppendArgs>(),
            permission: Permission::Critical,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        use tokio::io::AsyncWriteExt;
        let a: AppendArgs = serde_json::from_value(args).map_err(Error::from)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&a.path)
            .await
            .map_err(|e| Error::parse(format!("append_to_file: {e}")))?;
        file.write_all(a.content.as_bytes()).await.map_err(Error::from)?;
        Ok(serde_json::json!({"appended_bytes": a.content.len()}))
    }
}

async fn rewrite_lines(path: &str, f: impl FnOnce(Vec<String>) -> Vec<String>) -> Result<usize> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::parse(format!("{path}: {e}")))?;
    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    let new_lines = f(lines);
    let new_content = new_lines.join("\n");
    tokio::fs::write(path, &new_content)
        .await
        .map_err(|e| Error::parse(format!("{path}: {e}")))?;
    Ok(new_lines.len())
}

pub struct InsertLinesTool;

#[async_trait]
impl Tool for InsertLinesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "insert_lines".to_string(),
            description: "Inserts content before a given 1-indexed line.".to_string(),
            parameters: schema_for_args::<InsertLinesArgs>(),
            permission: Permission::Critical,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let a: InsertLinesArgs = serde_json::from_value(args).map_err(Error::from)?;
        let inserted: Vec<String> = a.content.lines().map(str::to_string).collect();
        let total = rewrite_lines(&a.path, |mut lines| {
            let at = a.at_line.saturating_sub(1).min(lines.len());
            let tail = lines.split_off(at);
            lines.extend(inserted);
            lines.extend(tail);
            lines
        })
        .await?;
        Ok(serde_json::json!({"total_lines": total}))
    }
}

pub struct DeleteLinesTool;

#[async_trait]
impl Tool for DeleteLinesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "delete_lines".to_string(),
            description: "Deletes the inclusive 1-indexed line range `[start, end]`.".to_string(),
            parameters: schema_for_args::<DeleteLinesArgs>(),
            permission: Permission::Critical,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let a: DeleteLinesArgs = serde_json::from_value(args).map_err(Error::from)?;
        let total = rewrite_lines(&a.path, |lines| {
            lines
                .into_iter()
                .enumerate()
                .filter(|(i, _)| *i + 1 < a.start || *i + 1 > a.end)
                .map(|(_, l)| l)
                .collect()
        })
        .await?;
        Ok(serde_json::json!({"total_lines": total}))
    }
}

pub struct ReplaceLinesTool;

#[async_trait]
impl Tool for ReplaceLinesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "replace_lines".to_string(),
            description: "Replaces the inclusive 1-indexed line range `[start, end]` with content.".to_string(),
            parameters: schema_for_args::<ReplaceLinesArgs>(),
            permission: Permission::Critical,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let a: ReplaceLinesArgs = serde_json::from_value(args).map_err(Error::from)?;
        let replacement: Vec<String> = a.content.lines().map(str::to_string).collect();
        let total = rewrite_lines(&a.path, |lines| {
            let mut out = Vec::new();
            for (i, line) in lines.into_iter().enumerate() {
                let n = i + 1;
                if n == a.start {
                    out.extend(replacement.iter().cloned());
                }
                if n < a.start || n > a.end {
                    out.push(line);
                }
            }
            out
        })
        .await?;
        Ok(serde_json::json!({"total_lines": total}))
    }
}

pub struct RunCommandTool {
    pub allowed_commands: Vec<String>,
}

#[async_trait]
impl Tool for RunCommandTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "run_command".to_string(),
            description: "Runs an allow-listed shell command with arguments.".to_string(),
            parameters: schema_for_args::<RunCommandArgs>(),
            permission: Permission::Critical,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let a: RunCommandArgs = serde_json::from_value(args).map_err(Error::from)?;
        if !self.allowed_commands.iter().any(|c| c == &a.command) {
            return Err(Error::permission_denied(format!("command `{}` is not allow-listed", a.command)));
        }
        let output = tokio::process::Command::new(&a.command)
            .args(&a.args)
            .output()
            .await
            .map_err(|e| Error::parse(format!("run_command: {e}")))?;
        Ok(serde_json::json!({
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
            "exit_code": output.status.code(),
        }))
    }
}

#[must_use]
pub fn path_extension_matches(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.contains(&e))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.txt");
        let write = WriteFileTool;
        write
            .call(json!({"path": path.to_string_lossy(), "content": "hello"}))
            .await
            .unwrap();
        let read = ReadFileTool;
        let result = read.call(json!({"path": path.to_string_lossy()})).await.unwrap();
        assert_eq!(result, json!("hello"));
    }

    #[tokio::test]
    async fn insert_lines_splices_before_target_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.txt");
        tokio::fs::write(&path, "a\nb\nc").await.unwrap();
        let tool = InsertLinesTool;
        tool.call(json!({"path": path.to_string_lossy(), "at_line": 2, "content": "z"}))
            .await
            .unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "a\nz\nb\nc");
    }

    #[tokio::test]
    async fn run_command_rejects_non_allowlisted_commands() {
        let tool = RunCommandTool {
            allowed_commands: vec!["echo".to_string()],
        };
        let err = tool.call(json!({"command": "rm", "args": ["-rf", "/"]})).await.unwrap_err();
        assert_eq!(err.kind(), hydra_core::ErrorKind::PermissionDenied);
    }
}
