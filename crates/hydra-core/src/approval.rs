//! Approval Record data model (spec §3 "Approval Record", §4.10).
//!
//! The tracker implementation (hashing, pattern matching, history) lives in
//! `hydra-tools::approval`; this module only defines the shared types so
//! that `hydra-core::tool::Permission` and the approval record can be
//! referenced without a circular crate dependency.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the condition kinds an auto-approval pattern may apply (spec
/// §4.10). Open Question resolved in DESIGN.md: argument normalization
/// uses sorted keys, trimmed strings, and absolutized file paths before
/// hashing, so that equivalent argument maps hash identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternCondition {
    PathPrefix { allowed_prefixes: Vec<String> },
    FileExtension { allowed_exts: Vec<String> },
    MaxFileSize { bytes: u64 },
    SessionLimit { max_uses: u32 },
}

/// A rule that grants blanket approval for a tool call under enumerated
/// conditions. Never applies to `critical` tools (spec GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalPattern {
    pub tool_name: String,
    pub arg_regex: Option<String>,
    pub conditions: Vec<PatternCondition>,
}

/// A recorded approval decision, keyed by the stable hash of
/// `(tool, normalized(args))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub hash: String,
    pub tool_name: String,
    pub auto_approved: bool,
    pub timestamp: DateTime<Utc>,
}

/// Queryable statistics over a session's approval history (spec §4.10).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalStats {
    pub total: usize,
    pub unique_ops: usize,
    pub patterns: usize,
    pub session_usage: HashMap<String, u32>,
    pub recent: Vec<ApprovalRecord>,
}
