//! Optional git tools (spec §4.10): `git_status` (safe), `git_commit`
//! (requires_approval), available only inside a version-controlled
//! workspace. Also implements [`hydra_tools::VersionControl`], the
//! capability critical file-mutating tools use to isolate a change on a
//! "Hydra branch" and capture its diff (spec GLOSSARY "Hydra branch").

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{Repository, Signature, StatusOptions};
use hydra_core::tool::{Permission, ToolDescriptor};
use hydra_core::{Error, Result};
use hydra_tools::{Tool, VersionControl};
use serde_json::Value;

/// Thin wrapper over a discovered repository, mirroring the teacher's
/// `GitTool::discover`/`open` split.
pub struct GitWorkspace {
    repo_root: PathBuf,
}

impl GitWorkspace {
    /// Walks up from `path` looking for a `.git` directory.
    #[must_use]
    pub fn discover(path: impl AsRef<Path>) -> Option<Self> {
        let repo = Repository::discover(path.as_ref()).ok()?;
        let repo_root = repo.workdir()?.to_path_buf();
        Some(Self { repo_root })
    }

    fn open(&self) -> Result<Repository> {
        Repository::open(&self.repo_root).map_err(|e| Error::parse(format!("git open: {e}")))
    }
}

impl VersionControl for GitWorkspace {
    fn is_vcs_workspace(&self, path: &Path) -> bool {
        path.starts_with(&self.repo_root) || path.is_relative()
    }

    /// Creates a branch named `{prefix}/{unix_timestamp}` off `HEAD` and
    /// checks it out, so a critical tool's change lands somewhere
    /// reviewable and revertible rather than on the caller's branch.
    fn create_feature_branch(&self, prefix: &str) -> Result<String> {
        let repo = self.open()?;
        let head = repo.head().map_err(|e| Error::parse(format!("git head: {e}")))?;
        let commit = head.peel_to_commit().map_err(|e| Error::parse(format!("git peel: {e}")))?;
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let branch_name = format!("{prefix}/{stamp}");
        repo.branch(&branch_name, &commit, false)
            .map_err(|e| Error::parse(format!("git branch: {e}")))?;
        let obj = repo
            .revparse_single(&format!("refs/heads/{branch_name}"))
            .map_err(|e| Error::parse(format!("git revparse: {e}")))?;
        repo.checkout_tree(&obj, None)
            .map_err(|e| Error::parse(format!("git checkout: {e}")))?;
        repo.set_head(&format!("refs/heads/{branch_name}"))
            .map_err(|e| Error::parse(format!("git set_head: {e}")))?;
        Ok(branch_name)
    }

    /// Unified diff of `path`'s working-tree changes against `HEAD`.
    fn diff(&self, path: &Path) -> Result<String> {
        let repo = self.open()?;
        let head_tree = repo
            .head()
            .and_then(|h| h.peel_to_tree())
            .map_err(|e| Error::parse(format!("git head tree: {e}")))?;
        let mut diff_opts = git2::DiffOptions::new();
        let relative = path.strip_prefix(&self.repo_root).unwrap_or(path);
        diff_opts.pathspec(relative);
        let diff = repo
            .diff_tree_to_workdir_with_index(Some(&head_tree), Some(&mut diff_opts))
            .map_err(|e| Error::parse(format!("git diff: {e}")))?;
        let mut out = String::new();
        diff.print(git2::DiffFormat::Patch, |_, _, line| {
            out.push_str(std::str::from_utf8(line.content()).unwrap_or(""));
            true
        })
        .map_err(|e| Error::parse(format!("git diff print: {e}")))?;
        Ok(out)
    }
}

pub struct GitStatusTool {
    pub repo_root: PathBuf,
}

#[async_trait]
impl Tool for GitStatusTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "git_status".to_string(),
            description: "Lists modified, added, and untracked files in the working tree.".to_string(),
            parameters: schemars::schema_for!(()),
            permission: Permission::Safe,
        }
    }

    async fn call(&self, _args: Value) -> Result<Value> {
        let repo_root = self.repo_root.clone();
        tokio::task::spawn_blocking(move || {
            let repo = Repository::open(&repo_root).map_err(|e| Error::parse(format!("git open: {e}")))?;
            let mut opts = StatusOptions::new();
            opts.include_untracked(true);
            let statuses = repo.statuses(Some(&mut opts)).map_err(|e| Error::parse(format!("git status: {e}")))?;
            let entries: Vec<String> = statuses
                .iter()
                .filter_map(|e| e.path().map(|p| format!("{:?} {p}", e.status())))
                .collect();
            Ok(Value::Array(entries.into_iter().map(Value::String).collect()))
        })
        .await
        .map_err(|e| Error::parse(format!("git_status join: {e}")))?
    }
}

pub struct GitCommitTool {
    pub repo_root: PathBuf,
    pub author_name: String,
    pub author_email: String,
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
struct CommitArgs {
    message: String,
}

#[async_trait]
impl Tool for GitCommitTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "git_commit".to_string(),
            description: "Stages all changes and creates a commit with the given message.".to_string(),
            parameters: schemars::schema_for!(CommitArgs),
            permission: Permission::RequiresApproval,
        }
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let a: CommitArgs = serde_json::from_value(args).map_err(Error::from)?;
        let repo_root = self.repo_root.clone();
        let author_name = self.author_name.clone();
        let author_email = self.author_email.clone();
        tokio::task::spawn_blocking(move || {
            let repo = Repository::open(&repo_root).map_err(|e| Error::parse(format!("git open: {e}")))?;
            let mut index = repo.index().map_err(|e| Error::parse(format!("git index: {e}")))?;
            index
                .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
                .map_err(|e| Error::parse(format!("git add: {e}")))?;
            index.write().map_err(|e| Error::parse(format!("git write index: {e}")))?;
            let tree_id = index.write_tree().map_err(|e| Error::parse(format!("git write tree: {e}")))?;
            let tree = repo.find_tree(tree_id).map_err(|e| Error::parse(format!("git find tree: {e}")))?;
            let sig = Signature::now(&author_name, &author_email).map_err(|e| Error::parse(format!("git sig: {e}")))?;
            let parent = repo
                .head()
                .and_then(|h| h.peel_to_commit())
                .map_err(|e| Error::parse(format!("git head: {e}")))?;
            let commit_id = repo
                .commit(Some("HEAD"), &sig, &sig, &a.message, &tree, &[&parent])
                .map_err(|e| Error::parse(format!("git commit: {e}")))?;
            Ok(serde_json::json!({"commit_id": commit_id.to_string()}))
        })
        .await
        .map_err(|e| Error::parse(format!("git_commit join: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo(dir: &Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        std::fs::write(dir.join("a.txt"), "one\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("a.txt")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();
        repo
    }

    #[tokio::test]
    async fn git_status_reports_untracked_file() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("b.txt"), "new\n").unwrap();
        let tool = GitStatusTool {
            repo_root: dir.path().to_path_buf(),
        };
        let result = tool.call(Value::Null).await.unwrap();
        let entries = result.as_array().unwrap();
        assert!(entries.iter().any(|e| e.as_str().unwrap().contains("b.txt")));
    }

    #[test]
    fn create_feature_branch_checks_out_new_branch() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let workspace = GitWorkspace {
            repo_root: dir.path().to_path_buf(),
        };
        let branch = workspace.create_feature_branch("hydra").unwrap();
        assert!(branch.starts_with("hydra/"));
        let repo = Repository::open(dir.path()).unwrap();
        let head = repo.head().unwrap();
        assert_eq!(head.shorthand().unwrap(), branch);
    }
}
