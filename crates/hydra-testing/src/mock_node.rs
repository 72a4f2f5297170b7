//! Plain `Node` fixtures, for Router/Registry tests that need specific
//! resource/health states but no real HTTP listener behind them.

use hydra_core::node::{Node, NodeId, NodeKind};

/// Builds a [`Node`] with a deterministic, overridable starting state.
pub struct MockNode {
    node: Node,
}

impl MockNode {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        Self {
            node: Node::new(NodeId::new(id), "127.0.0.1", 0, kind),
        }
    }

    #[must_use]
    pub fn healthy_gpu(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Gpu)
    }

    #[must_use]
    pub fn healthy_cpu(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Cpu)
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.node.port = port;
        self
    }

    #[must_use]
    pub fn with_healthy(mut self, healthy: bool) -> Self {
        self.node.healthy = healthy;
        self
    }

    #[must_use]
    pub fn with_vram(mut self, total_mb: u64, available_mb: u64) -> Self {
        self.node.vram_total_mb = total_mb;
        self.node.vram_available_mb = available_mb;
        self
    }

    #[must_use]
    pub fn with_loaded_models(mut self, models: &[&str]) -> Self {
        self.node.loaded_models = models.iter().map(|m| (*m).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_active_requests(mut self, active: u32, max_concurrent: u32) -> Self {
        self.node.active_requests = active;
        self.node.max_concurrent = max_concurrent;
        self
    }

    #[must_use]
    pub fn with_failure_streak(mut self, streak: u32) -> Self {
        self.node.failure_streak = streak;
        self
    }

    #[must_use]
    pub fn build(self) -> Node {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_layer_onto_healthy_defaults() {
        let node = MockNode::healthy_gpu("n1").with_vram(8192, 4096).with_active_requests(1, 3).build();
        assert!(node.healthy);
        assert_eq!(node.kind, NodeKind::Gpu);
        assert_eq!(node.vram_available_mb, 4096);
        assert_eq!(node.active_requests, 1);
    }

    #[test]
    fn with_healthy_false_overrides_the_default() {
        let node = MockNode::healthy_cpu("n2").with_healthy(false).build();
        assert!(!node.healthy);
    }
}
