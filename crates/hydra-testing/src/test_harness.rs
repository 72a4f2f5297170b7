//! Assembles a [`NodeRegistry`] out of one or more [`MockBackendClient`]s,
//! so Router/Pool tests can exercise real node selection and failover
//! logic without a live cluster.

use std::sync::Arc;

use hydra_core::node::{NodeId, NodeKind};
use hydra_registry::NodeRegistry;

use crate::mock_backend_client::MockBackendClient;

/// A registry wired up with one mock node per backend, plus the backends
/// themselves (kept alive for the harness's lifetime).
pub struct TestCluster {
    pub registry: Arc<NodeRegistry>,
    pub backends: Vec<MockBackendClient>,
}

impl TestCluster {
    /// Starts `count` mock nodes, all healthy GPU nodes by default, and
    /// registers them under ids `node-0`, `node-1`, ...
    pub async fn with_nodes(count: usize) -> Self {
        let registry = Arc::new(NodeRegistry::new());
        let mut backends = Vec::with_capacity(count);

        for i in 0..count {
            let backend = MockBackendClient::start().await;
            let node = backend.as_node(NodeId::new(format!("node-{i}")), NodeKind::Gpu);
            registry.upsert(node);
            backends.push(backend);
        }

        Self { registry, backends }
    }

    #[must_use]
    pub fn node_id(&self, index: usize) -> NodeId {
        NodeId::new(format!("node-{index}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_nodes_registers_one_node_per_backend() {
        let cluster = TestCluster::with_nodes(3).await;
        assert_eq!(cluster.registry.len(), 3);
        assert_eq!(cluster.backends.len(), 3);
        assert!(cluster.registry.contains(&cluster.node_id(0)));
    }
}
