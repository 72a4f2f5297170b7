//! Node and Model Descriptor data model (spec §3).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable node identity. Newtype rather than a bare `String` so the Router
/// and Registry APIs cannot accidentally accept a raw host string where a
/// node id is expected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Hardware character of a node, used by the Router's GPU/CPU bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Gpu,
    Cpu,
    Hybrid,
}

/// Bounded rolling window of recent latencies, last N=100, used to derive
/// `avg_latency_ms`. A `VecDeque` keeps push/pop at both ends O(1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyWindow {
    samples: VecDeque<u64>,
    capacity: usize,
}

impl LatencyWindow {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, latency_ms: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(latency_ms);
    }

    #[must_use]
    pub fn avg_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.samples.iter().sum();
        sum as f64 / self.samples.len() as f64
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

const DEFAULT_LATENCY_WINDOW: usize = 100;
/// `failure_streak` threshold past which a node is forced unhealthy.
pub const UNHEALTHY_FAILURE_STREAK: u32 = 3;
/// Default staleness threshold: a node with no heartbeat for this long is
/// forced unhealthy regardless of its failure streak.
pub const DEFAULT_STALE_SECS: i64 = 120;

/// A single reachable inference backend instance (spec §3 "Node").
///
/// Lifecycle: created by the Health Monitor on first discovery; mutated
/// only by the Health Monitor and the Router (request counters); removed
/// when marked permanently unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
    pub kind: NodeKind,

    pub healthy: bool,
    pub last_heartbeat: DateTime<Utc>,
    pub failure_streak: u32,

    pub vram_total_mb: u64,
    pub vram_available_mb: u64,
    pub ram_available_gb: f64,
    pub cpu_percent: f64,
    pub loaded_models: Vec<String>,
    pub active_requests: u32,
    pub max_concurrent: u32,

    pub latency_window: LatencyWindow,
    pub success_count: u64,
    pub failure_count: u64,
}

impl Node {
    #[must_use]
    pub fn new(id: impl Into<NodeId>, host: impl Into<String>, port: u16, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            kind,
            healthy: true,
            last_heartbeat: Utc::now(),
            failure_streak: 0,
            vram_total_mb: 0,
            vram_available_mb: 0,
            ram_available_gb: 0.0,
            cpu_percent: 0.0,
            loaded_models: Vec::new(),
            active_requests: 0,
            max_concurrent: 3,
            latency_window: LatencyWindow::new(DEFAULT_LATENCY_WINDOW),
            success_count: 0,
            failure_count: 0,
        }
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// `success_rate = success/(success+failure)`; no evidence is
    /// optimistic (`1.0`) per the invariant in spec §3.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            1.0
        } else {
            self.success_count as f64 / total as f64
        }
    }

    #[must_use]
    pub fn avg_latency_ms(&self) -> f64 {
        self.latency_window.avg_ms()
    }

    #[must_use]
    pub fn load_ratio(&self) -> f64 {
        if self.max_concurrent == 0 {
            return 1.0;
        }
        f64::from(self.active_requests) / f64::from(self.max_concurrent)
    }

    /// Recomputes `healthy` from `failure_streak` and staleness, per the
    /// invariant: `healthy=false` iff `failure_streak >= 3` or
    /// `now - last_heartbeat > T_stale`.
    pub fn recompute_health(&mut self, stale_after_secs: i64) {
        let stale = (Utc::now() - self.last_heartbeat).num_seconds() > stale_after_secs;
        self.healthy = self.failure_streak < UNHEALTHY_FAILURE_STREAK && !stale;
    }

    pub fn record_success(&mut self, latency_ms: u64) {
        self.failure_streak = 0;
        self.success_count += 1;
        self.latency_window.push(latency_ms);
        self.last_heartbeat = Utc::now();
        self.healthy = true;
    }

    pub fn record_failure(&mut self) {
        self.failure_streak += 1;
        self.failure_count += 1;
        if self.failure_streak >= UNHEALTHY_FAILURE_STREAK {
            self.healthy = false;
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self.host.as_str(), "localhost" | "127.0.0.1" | "::1")
    }
}

/// Size class used by the Pool Facade to decide proactive `keep_alive=0`
/// eviction hints (spec §3 "Model Descriptor").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSizeClass {
    Small,
    Medium,
    Large,
}

impl ModelSizeClass {
    #[must_use]
    pub fn from_gb(memory_gb: f64) -> Self {
        if memory_gb < 3.0 {
            ModelSizeClass::Small
        } else if memory_gb <= 8.0 {
            ModelSizeClass::Medium
        } else {
            ModelSizeClass::Large
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub memory_gb: f64,
    pub size_class: ModelSizeClass,
}

impl ModelDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, memory_gb: f64) -> Self {
        Self {
            name: name.into(),
            memory_gb,
            size_class: ModelSizeClass::from_gb(memory_gb),
        }
    }
}
