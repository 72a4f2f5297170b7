//! Router (spec §4.4): selects one node per request according to its
//! routing mode, after filtering, scoring, and deterministic tie-breaks.

use hydra_core::node::{Node, NodeId, NodeKind};
use hydra_core::request::{RoutingHints, RoutingMode};
use hydra_registry::NodeRegistry;
use tracing::debug;

/// Scoring weights for the balanced (default) and FAST modes (spec §4.4
/// table). Kept as named constants rather than magic numbers so the
/// scoring function reads the same way the table does.
const FAST_GPU_BONUS: f64 = 2.0;
const FAST_LOAD_WEIGHT: f64 = 1.0;
const FAST_LATENCY_ALPHA: f64 = 0.01;
const FAST_SUCCESS_BETA: f64 = 1.0;
const ASYNC_CPU_BONUS: f64 = 2.0;
const BALANCED_LOAD_WEIGHT: f64 = 0.6;
const BALANCED_MEM_WEIGHT: f64 = 0.4;
const BALANCED_GPU_BONUS_MULTIPLIER: f64 = 1.5;

/// The routing decision record (spec §4.4): the chosen node, a reason
/// string, and every filter that was applied. The Pool logs this but does
/// not alter selection based on it.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub node_id: NodeId,
    pub reason: String,
    pub filters_applied: Vec<String>,
}

/// Extra signal the caller may supply when scoring a balanced-mode request
/// for a code task that explicitly wants GPU affinity (spec §4.4 table,
/// "GPU bonus x1.5 when a code task requests GPU").
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingContext {
    pub code_task_wants_gpu: bool,
}

fn estimated_mem_use_ratio(node: &Node) -> f64 {
    if node.vram_total_mb == 0 {
        return 0.0;
    }
    let used = node.vram_total_mb.saturating_sub(node.vram_available_mb);
    used as f64 / node.vram_total_mb as f64
}

fn score_fast(node: &Node) -> f64 {
    let gpu_bonus = if node.kind == NodeKind::Gpu { FAST_GPU_BONUS } else { 0.0 };
    gpu_bonus - FAST_LOAD_WEIGHT * node.load_ratio() - FAST_LATENCY_ALPHA * node.avg_latency_ms()
        + FAST_SUCCESS_BETA * node.success_rate()
}

fn score_async(node: &Node, prefer_cpu: bool) -> f64 {
    let cpu_bonus = if prefer_cpu && node.kind == NodeKind::Cpu {
        ASYNC_CPU_BONUS
    } else {
        0.0
    };
    cpu_bonus - node.load_ratio()
}

fn score_balanced(node: &Node, ctx: RoutingContext) -> f64 {
    let base = BALANCED_LOAD_WEIGHT * (1.0 - node.load_ratio())
        + BALANCED_MEM_WEIGHT * (1.0 - estimated_mem_use_ratio(node));
    if ctx.code_task_wants_gpu && node.kind == NodeKind::Gpu {
        base * BALANCED_GPU_BONUS_MULTIPLIER
    } else {
        base
    }
}

/// Deterministic tie-break: lowest `active_requests`, then lowest
/// `avg_latency_ms`, then alphabetical `id` (spec §4.4).
fn tie_break_key(node: &Node) -> (u32, u64, String) {
    (
        node.active_requests,
        node.avg_latency_ms().round() as u64,
        node.id.0.clone(),
    )
}

#[derive(Debug, Clone, Default)]
pub struct Router;

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Selects one node from `registry` for `hints` under `ctx`. Returns
    /// `None` only when every filter eliminates every node (the caller,
    /// `hydra-pool`, turns that into `Error::no_healthy_nodes`).
    #[must_use]
    pub fn select(
        &self,
        registry: &NodeRegistry,
        hints: &RoutingHints,
        ctx: RoutingContext,
    ) -> Option<RoutingDecision> {
        self.select_excluding(registry, hints, ctx, &[])
    }

    /// As [`Router::select`], but drops any node in `exclude` before
    /// filtering and scoring. Used by the Pool Facade's failover loop so a
    /// node that just failed this request isn't immediately reselected
    /// (spec §4.5: fail over to the next candidate).
    #[must_use]
    pub fn select_excluding(
        &self,
        registry: &NodeRegistry,
        hints: &RoutingHints,
        ctx: RoutingContext,
        exclude: &[NodeId],
    ) -> Option<RoutingDecision> {
        let all = registry.all_snapshots();
        let mut filters_applied = Vec::new();

        // Explicit node_id override: select unconditionally if healthy and
        // not excluded from a prior failed attempt this request.
        if let Some(ref requested) = hints.node_id {
            if !exclude.contains(requested) {
                if let Some(node) = all.iter().find(|n| &n.id == requested && n.healthy) {
                    filters_applied.push("explicit_node_id".to_string());
                    return Some(RoutingDecision {
                        node_id: node.id.clone(),
                        reason: "explicit node_id override".to_string(),
                        filters_applied,
                    });
                }
            }
            filters_applied.push("explicit_node_id_unavailable_fallback_to_scoring".to_string());
        }

        let mut candidates: Vec<&Node> = all.iter().filter(|n| n.healthy && !exclude.contains(&n.id)).collect();
        filters_applied.push("healthy".to_string());

        if let Some(min_vram_gb) = hints.min_vram_gb {
            let min_vram_mb = (min_vram_gb * 1024.0) as u64;
            candidates.retain(|n| n.vram_available_mb >= min_vram_mb);
            filters_applied.push("min_vram_gb".to_string());
        }

        if hints.mode == RoutingMode::Reliable {
            if let Some(min_success_rate) = hints.min_success_rate {
                candidates.retain(|n| n.success_rate() >= min_success_rate);
                filters_applied.push("min_success_rate".to_string());
            }
        }

        if candidates.is_empty() {
            return None;
        }

        if hints.prefer_local {
            if let Some(local) = candidates.iter().find(|n| n.is_local()).copied() {
                filters_applied.push("prefer_local".to_string());
                return Some(RoutingDecision {
                    node_id: local.id.clone(),
                    reason: "prefer_local matched a healthy local node".to_string(),
                    filters_applied,
                });
            }
        }

        let scored: Vec<(f64, &Node)> = match hints.mode {
            RoutingMode::Fast => candidates.iter().map(|n| (score_fast(n), *n)).collect(),
            RoutingMode::Reliable => candidates
                .iter()
                .map(|n| (-(n.failure_count as f64) - n.load_ratio(), *n))
                .collect(),
            RoutingMode::Async => candidates
                .iter()
                .map(|n| (score_async(n, hints.prefer_cpu), *n))
                .collect(),
            RoutingMode::Balanced => candidates.iter().map(|n| (score_balanced(n, ctx), *n)).collect(),
        };

        let best_score = scored
            .iter()
            .map(|(s, _)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        let mut best: Vec<&Node> = scored
            .iter()
            .filter(|(s, _)| (*s - best_score).abs() < 1e-9)
            .map(|(_, n)| *n)
            .collect();
        best.sort_by_key(|n| tie_break_key(n));

        let chosen = best.first()?;
        debug!(node_id = %chosen.id, mode = ?hints.mode, score = best_score, "router selected node");

        Some(RoutingDecision {
            node_id: chosen.id.clone(),
            reason: format!("{:?} mode scoring selected {} (score {:.3})", hints.mode, chosen.id, best_score),
            filters_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_core::node::Node;

    fn registry_with(nodes: Vec<Node>) -> NodeRegistry {
        let registry = NodeRegistry::new();
        for n in nodes {
            registry.upsert(n);
        }
        registry
    }

    #[test]
    fn unhealthy_nodes_are_never_selected() {
        let mut unhealthy = Node::new("bad", "localhost", 1, NodeKind::Gpu);
        unhealthy.healthy = false;
        let healthy = Node::new("good", "localhost", 2, NodeKind::Gpu);
        let registry = registry_with(vec![unhealthy, healthy]);

        let decision = Router::new()
            .select(&registry, &RoutingHints::default(), RoutingContext::default())
            .unwrap();
        assert_eq!(decision.node_id, NodeId::new("good"));
    }

    #[test]
    fn reliable_mode_enforces_min_success_rate() {
        let mut weak = Node::new("weak", "localhost", 1, NodeKind::Gpu);
        weak.success_count = 1;
        weak.failure_count = 9; // success_rate 0.1
        let mut strong = Node::new("strong", "localhost", 2, NodeKind::Gpu);
        strong.success_count = 9;
        strong.failure_count = 1; // success_rate 0.9
        let registry = registry_with(vec![weak, strong]);

        let hints = RoutingHints {
            mode: RoutingMode::Reliable,
            min_success_rate: Some(0.5),
            ..Default::default()
        };
        let decision = Router::new().select(&registry, &hints, RoutingContext::default()).unwrap();
        assert_eq!(decision.node_id, NodeId::new("strong"));
    }

    #[test]
    fn explicit_node_id_overrides_scoring_when_healthy() {
        let requested = Node::new("requested", "localhost", 1, NodeKind::Cpu);
        let better = Node::new("better", "localhost", 2, NodeKind::Gpu);
        let registry = registry_with(vec![requested, better]);

        let hints = RoutingHints {
            node_id: Some(NodeId::new("requested")),
            ..Default::default()
        };
        let decision = Router::new().select(&registry, &hints, RoutingContext::default()).unwrap();
        assert_eq!(decision.node_id, NodeId::new("requested"));
    }

    #[test]
    fn tie_break_is_deterministic_alphabetical() {
        let a = Node::new("a-node", "localhost", 1, NodeKind::Gpu);
        let b = Node::new("b-node", "localhost", 2, NodeKind::Gpu);
        let registry = registry_with(vec![b, a]);

        let decision = Router::new()
            .select(&registry, &RoutingHints::default(), RoutingContext::default())
            .unwrap();
        assert_eq!(decision.node_id, NodeId::new("a-node"));
    }

    #[test]
    fn no_healthy_nodes_yields_none() {
        let mut unhealthy = Node::new("bad", "localhost", 1, NodeKind::Gpu);
        unhealthy.healthy = false;
        let registry = registry_with(vec![unhealthy]);
        assert!(Router::new()
            .select(&registry, &RoutingHints::default(), RoutingContext::default())
            .is_none());
    }

    #[test]
    fn select_excluding_skips_listed_nodes() {
        let a = Node::new("a-node", "localhost", 1, NodeKind::Gpu);
        let b = Node::new("b-node", "localhost", 2, NodeKind::Gpu);
        let registry = registry_with(vec![a, b]);

        let decision = Router::new()
            .select_excluding(&registry, &RoutingHints::default(), RoutingContext::default(), &[NodeId::new("a-node")])
            .unwrap();
        assert_eq!(decision.node_id, NodeId::new("b-node"));
    }

    #[test]
    fn async_mode_prefers_cpu_when_requested() {
        let gpu = Node::new("gpu", "localhost", 1, NodeKind::Gpu);
        let cpu = Node::new("cpu", "localhost", 2, NodeKind::Cpu);
        let registry = registry_with(vec![gpu, cpu]);

        let hints = RoutingHints {
            mode: RoutingMode::Async,
            prefer_cpu: true,
            ..Default::default()
        };
        let decision = Router::new().select(&registry, &hints, RoutingContext::default()).unwrap();
        assert_eq!(decision.node_id, NodeId::new("cpu"));
    }
}
