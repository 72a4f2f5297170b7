//! Health Monitor (spec §4.2): a cooperative loop at interval `T_probe`
//! (default 120s) that probes every known node, maintains liveness, and
//! guarantees at-least-one availability when localhost is in the
//! configured set.

use std::sync::Arc;
use std::time::Duration;

use hydra_client::BackendClient;
use hydra_core::node::{DEFAULT_STALE_SECS, NodeId};
use tracing::{debug, info, warn};

use crate::registry::NodeRegistry;

#[derive(Debug, Clone, Copy)]
pub struct HealthMonitorConfig {
    pub probe_interval: Duration,
    pub stale_after_secs: i64,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(120),
            stale_after_secs: DEFAULT_STALE_SECS,
        }
    }
}

pub struct HealthMonitor {
    registry: Arc<NodeRegistry>,
    config: HealthMonitorConfig,
}

impl HealthMonitor {
    #[must_use]
    pub fn new(registry: Arc<NodeRegistry>, config: HealthMonitorConfig) -> Self {
        Self { registry, config }
    }

    /// Runs one probe pass over every known node (spec §4.2). Local nodes
    /// trust their last self-report and are not probed; every other node
    /// gets a cheap `health()` call.
    pub async fn probe_once(&self) {
        let nodes = self.registry.all_snapshots();
        for node in &nodes {
            if node.is_local() {
                self.registry.mutate(&node.id, |n| {
                    n.recompute_health(self.config.stale_after_secs);
                });
                continue;
            }
            let client = BackendClient::new(node.url());
            let healthy = client.health().await;
            let id = node.id.clone();
            self.registry.mutate(&id, |n| {
                if healthy {
                    n.failure_streak = 0;
                    n.healthy = true;
                    n.last_heartbeat = chrono::Utc::now();
                } else {
                    n.record_failure();
                }
                n.recompute_health(self.config.stale_after_secs);
            });
            if !healthy {
                warn!(node_id = %id, "health probe failed");
            }
        }

        if self.registry.all_snapshots().iter().all(|n| !n.healthy) {
            self.recovery_probe_localhost().await;
        }
    }

    /// Guarantees at-least-one availability: if localhost is among the
    /// configured nodes and responds, force it healthy even if its
    /// failure streak would otherwise say otherwise (spec §4.2).
    async fn recovery_probe_localhost(&self) {
        let nodes = self.registry.all_snapshots();
        let Some(local) = nodes.iter().find(|n| n.is_local()) else {
            return;
        };
        let client = BackendClient::new(local.url());
        if client.health().await {
            info!(node_id = %local.id, "recovery probe succeeded, forcing localhost healthy");
            let id = local.id.clone();
            self.registry.mutate(&id, |n| {
                n.failure_streak = 0;
                n.healthy = true;
                n.last_heartbeat = chrono::Utc::now();
            });
        }
    }

    /// Runs `probe_once` forever at `probe_interval`, until the returned
    /// handle's future is dropped/aborted.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.probe_interval);
            loop {
                ticker.tick().await;
                debug!("running health probe pass");
                self.probe_once().await;
            }
        })
    }

    #[must_use]
    pub fn all_unhealthy(&self) -> bool {
        self.registry.all_snapshots().iter().all(|n| !n.healthy)
    }

    #[must_use]
    pub fn healthy_node_ids(&self) -> Vec<NodeId> {
        self.registry
            .all_snapshots()
            .into_iter()
            .filter(|n| n.healthy)
            .map(|n| n.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_core::node::{Node, NodeKind};

    #[tokio::test]
    async fn local_node_is_not_probed_and_recomputed_from_state() {
        let registry = Arc::new(NodeRegistry::new());
        let mut node = Node::new("local", "localhost", 11434, NodeKind::Gpu);
        node.failure_streak = 5;
        registry.upsert(node);

        let monitor = HealthMonitor::new(registry.clone(), HealthMonitorConfig::default());
        monitor.probe_once().await;

        let snap = registry.snapshot(&NodeId::new("local")).unwrap();
        assert!(!snap.healthy);
    }

    #[tokio::test]
    async fn unreachable_remote_node_accumulates_failures() {
        let registry = Arc::new(NodeRegistry::new());
        registry.upsert(Node::new("remote", "127.0.0.1", 1, NodeKind::Gpu));

        let monitor = HealthMonitor::new(
            registry.clone(),
            HealthMonitorConfig {
                probe_interval: Duration::from_secs(1),
                stale_after_secs: DEFAULT_STALE_SECS,
            },
        );
        monitor.probe_once().await;

        let snap = registry.snapshot(&NodeId::new("remote")).unwrap();
        assert_eq!(snap.failure_streak, 1);
    }
}
