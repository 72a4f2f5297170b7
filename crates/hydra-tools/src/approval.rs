//! Approval Tracker (spec §4.10): hashes `(tool, normalized(args))`,
//! checks exact-hash history or auto-approval patterns, and keeps
//! session-scoped usage counters + an ordered history.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use chrono::Utc;
use hydra_core::approval::{ApprovalPattern, ApprovalRecord, ApprovalStats, PatternCondition};
use hydra_core::tool::Permission;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;

const RECENT_LIMIT: usize = 10;

/// Normalizes a tool-call argument map into a canonical form before
/// hashing (spec §9 Open Question, resolved): object keys sorted,
/// strings trimmed, and any key named `path`/`file_path`/`file`
/// absolutized against the current working directory.
#[must_use]
pub fn normalize_args(args: &Value) -> Value {
    match args {
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by_key(|(k, _)| k.as_str());
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                let normalized = match v {
                    Value::String(s) if k == "path" || k == "file_path" || k == "file" => {
                        Value::String(absolutize(s.trim()))
                    }
                    Value::String(s) => Value::String(s.trim().to_string()),
                    other => normalize_args(other),
                };
                out.insert(k.clone(), normalized);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_args).collect()),
        other => other.clone(),
    }
}

fn absolutize(path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_string_lossy().to_string()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(p).to_string_lossy().to_string())
            .unwrap_or_else(|_| path.to_string())
    }
}

/// Stable (non-cryptographic) hash of `(tool_name, normalized(args))`; the
/// approval key every session decision is keyed by.
#[must_use]
pub fn hash_call(tool_name: &str, args: &Value) -> String {
    let mut hasher = DefaultHasher::new();
    tool_name.hash(&mut hasher);
    normalize_args(args).to_string().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn pattern_matches(pattern: &ApprovalPattern, tool_name: &str, args: &Value, session_usage: &HashMap<String, u32>) -> bool {
    if pattern.tool_name != tool_name {
        return false;
    }
    if let Some(re) = &pattern.arg_regex {
        let Ok(re) = Regex::new(re) else { return false };
        if !re.is_match(&args.to_string()) {
            return false;
        }
    }
    pattern.conditions.iter().all(|cond| match cond {
        PatternCondition::PathPrefix { allowed_prefixes } => {
            let Some(path) = args.get("path").and_then(Value::as_str) else { return false };
            allowed_prefixes.iter().any(|p| path.starts_with(p.as_str()))
        }
        PatternCondition::FileExtension { allowed_exts } => {
            let Some(path) = args.get("path").and_then(Value::as_str) else { return false };
            let exts: Vec<&str> = allowed_exts.iter().map(|e| e.trim_start_matches('.')).collect();
            crate::builtin::path_extension_matches(Path::new(path), &exts)
        }
        PatternCondition::MaxFileSize { bytes } => {
            let Some(content) = args.get("content").and_then(Value::as_str) else { return true };
            (content.len() as u64) <= *bytes
        }
        PatternCondition::SessionLimit { max_uses } => {
            session_usage.get(tool_name).copied().unwrap_or(0) < *max_uses
        }
    })
}

#[derive(Debug, Default)]
struct TrackerState {
    approved_hashes: std::collections::HashSet<String>,
    history: Vec<ApprovalRecord>,
    session_usage: HashMap<String, u32>,
    patterns: Vec<ApprovalPattern>,
}

/// Single-lock session state around `(approved_set, history, counters)`
/// (spec §5 locking discipline).
#[derive(Debug, Default)]
pub struct ApprovalTracker {
    state: Mutex<TrackerState>,
}

impl ApprovalTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pattern(&self, pattern: ApprovalPattern) {
        self.state.lock().patterns.push(pattern);
    }

    /// `is_approved(tool, args, level)` (spec §4.10 contract). `Critical`
    /// never auto-approves via a pattern; it only proceeds once this exact
    /// `(tool, args)` hash has an explicit approval recorded this session
    /// (see [`Self::record_approval`]).
    #[must_use]
    pub fn is_approved(&self, tool_name: &str, args: &Value, permission: Permission) -> bool {
        match permission {
            Permission::Safe => true,
            Permission::Critical => {
                let state = self.state.lock();
                state.approved_hashes.contains(&hash_call(tool_name, args))
            }
            Permission::RequiresApproval => {
                let state = self.state.lock();
                let hash = hash_call(tool_name, args);
                if state.approved_hashes.contains(&hash) {
                    return true;
                }
                state
                    .patterns
                    .iter()
                    .any(|p| pattern_matches(p, tool_name, args, &state.session_usage))
            }
        }
    }

    /// Records a decision: increments the session counter and appends to
    /// history, regardless of whether approval was explicit or via a
    /// matched pattern.
    pub fn record_approval(&self, tool_name: &str, args: &Value, auto_approved: bool) {
        let hash = hash_call(tool_name, args);
        let mut state = self.state.lock();
        state.approved_hashes.insert(hash.clone());
        *state.session_usage.entry(tool_name.to_string()).or_insert(0) += 1;
        state.history.push(ApprovalRecord {
            hash,
            tool_name: tool_name.to_string(),
            auto_approved,
            timestamp: Utc::now(),
        });
    }

    #[must_use]
    pub fn stats(&self) -> ApprovalStats {
        let state = self.state.lock();
        let recent = state
            .history
            .iter()
            .rev()
            .take(RECENT_LIMIT)
            .cloned()
            .collect();
        ApprovalStats {
            total: state.history.len(),
            unique_ops: state.approved_hashes.len(),
            patterns: state.patterns.len(),
            session_usage: state.session_usage.clone(),
            recent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn safe_tools_are_always_approved() {
        let tracker = ApprovalTracker::new();
        assert!(tracker.is_approved("read_file", &json!({}), Permission::Safe));
    }

    #[test]
    fn critical_tools_are_never_auto_approved() {
        let tracker = ApprovalTracker::new();
        tracker.add_pattern(ApprovalPattern {
            tool_name: "write_file".to_string(),
            arg_regex: None,
            conditions: vec![],
        });
        assert!(!tracker.is_approved("write_file", &json!({}), Permission::Critical));
    }

    #[test]
    fn critical_tool_runs_once_its_exact_hash_is_approved() {
        let tracker = ApprovalTracker::new();
        let args = json!({"path": "x", "content": "y"});
        assert!(!tracker.is_approved("write_file", &args, Permission::Critical));
        tracker.record_approval("write_file", &args, false);
        assert!(tracker.is_approved("write_file", &args, Permission::Critical));
        // A different argument hash for the same tool is unaffected.
        assert!(!tracker.is_approved("write_file", &json!({"path": "z", "content": "y"}), Permission::Critical));
    }

    #[test]
    fn exact_hash_approval_persists_for_the_session() {
        let tracker = ApprovalTracker::new();
        let args = json!({"path": "notes.txt"});
        assert!(!tracker.is_approved("execute_python", &args, Permission::RequiresApproval));
        tracker.record_approval("execute_python", &args, false);
        assert!(tracker.is_approved("execute_python", &args, Permission::RequiresApproval));
    }

    #[test]
    fn pattern_grants_blanket_approval_under_path_prefix() {
        let tracker = ApprovalTracker::new();
        tracker.add_pattern(ApprovalPattern {
            tool_name: "execute_python".to_string(),
            arg_regex: None,
            conditions: vec![PatternCondition::PathPrefix {
                allowed_prefixes: vec!["/tmp/".to_string()],
            }],
        });
        let args = json!({"path": "/tmp/scratch.py"});
        assert!(tracker.is_approved("execute_python", &args, Permission::RequiresApproval));
    }

    #[test]
    fn pattern_grants_blanket_approval_under_file_extension() {
        let tracker = ApprovalTracker::new();
        tracker.add_pattern(ApprovalPattern {
            tool_name: "write_file".to_string(),
            arg_regex: None,
            conditions: vec![PatternCondition::FileExtension {
                allowed_exts: vec![".md".to_string()],
            }],
        });
        assert!(tracker.is_approved(
            "write_file",
            &json!({"path": "notes.md", "content": "x"}),
            Permission::RequiresApproval
        ));
        assert!(!tracker.is_approved(
            "write_file",
            &json!({"path": "notes.mymd", "content": "x"}),
            Permission::RequiresApproval
        ));
    }

    #[test]
    fn normalize_args_sorts_keys_and_trims_strings() {
        let a = normalize_args(&json!({"b": " x ", "a": 1}));
        let b = normalize_args(&json!({"a": 1, "b": "x"}));
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn stats_reports_session_usage_and_recent_window() {
        let tracker = ApprovalTracker::new();
        for i in 0..12 {
            tracker.record_approval("execute_python", &json!({"n": i}), false);
        }
        let stats = tracker.stats();
        assert_eq!(stats.total, 12);
        assert_eq!(stats.recent.len(), 10);
        assert_eq!(stats.session_usage["execute_python"], 12);
    }
}
