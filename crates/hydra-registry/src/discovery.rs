//! Node discovery (spec §4.2): explicit configuration list and/or a
//! network sweep of a configured CIDR. Results are merged into the
//! Registry; duplicates by `(host, port)` are collapsed.

use hydra_client::BackendClient;
use hydra_core::node::{Node, NodeKind};
use tracing::{debug, warn};

use crate::registry::NodeRegistry;

/// One explicit `host:port` entry from configuration.
#[derive(Debug, Clone)]
pub struct StaticNodeSpec {
    pub host: String,
    pub port: u16,
    pub kind: NodeKind,
}

impl StaticNodeSpec {
    /// Parses `"host:port"`, defaulting to the standard local-inference
    /// port `11434` when omitted.
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.splitn(2, ':');
        let host = parts.next()?.trim().to_string();
        if host.is_empty() {
            return None;
        }
        let port = match parts.next() {
            Some(p) => p.trim().parse().ok()?,
            None => 11434,
        };
        Some(Self {
            host,
            port,
            kind: NodeKind::Gpu,
        })
    }
}

fn node_id_for(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}

/// Merges a set of static specs into `registry`, collapsing duplicates by
/// `(host, port)` and skipping entries the registry already knows about.
pub async fn discover_static(registry: &NodeRegistry, specs: &[StaticNodeSpec]) {
    let mut seen = std::collections::HashSet::new();
    for spec in specs {
        let key = (spec.host.clone(), spec.port);
        if !seen.insert(key) {
            continue;
        }
        let id = node_id_for(&spec.host, spec.port);
        if registry.contains(&hydra_core::node::NodeId::new(id.clone())) {
            continue;
        }
        let client = BackendClient::new(format!("http://{}:{}", spec.host, spec.port));
        let healthy = client.health().await;
        if !healthy {
            warn!(host = %spec.host, port = spec.port, "node did not respond to initial health probe, registering anyway");
        }
        let mut node = Node::new(id, spec.host.clone(), spec.port, spec.kind);
        node.healthy = healthy;
        debug!(node_id = %node.id, "discovered static node");
        registry.upsert(node);
    }
}

/// Enumerates candidate `host:port` pairs across a `/24`-style CIDR by
/// probing the standard local-inference port on every host in range.
/// This is deliberately bounded and only invoked when `network_scan` is
/// enabled in configuration (spec §6 "Discovery"); it is not wired into
/// the default discovery path to avoid surprising network activity.
pub async fn discover_network_sweep(registry: &NodeRegistry, cidr_prefix: &str, port: u16) {
    for host_octet in 1..=254u8 {
        let host = format!("{cidr_prefix}.{host_octet}");
        let id = node_id_for(&host, port);
        if registry.contains(&hydra_core::node::NodeId::new(id.clone())) {
            continue;
        }
        let client = BackendClient::new(format!("http://{host}:{port}"));
        if client.health().await {
            let mut node = Node::new(id, host, port, NodeKind::Gpu);
            node.healthy = true;
            debug!(node_id = %node.id, "discovered node via network sweep");
            registry.upsert(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        let spec = StaticNodeSpec::parse("10.0.0.5:11434").unwrap();
        assert_eq!(spec.host, "10.0.0.5");
        assert_eq!(spec.port, 11434);
    }

    #[test]
    fn defaults_port_when_omitted() {
        let spec = StaticNodeSpec::parse("10.0.0.5").unwrap();
        assert_eq!(spec.port, 11434);
    }

    #[test]
    fn rejects_empty_host() {
        assert!(StaticNodeSpec::parse(":11434").is_none());
    }

    #[tokio::test]
    async fn discover_static_collapses_duplicates() {
        let registry = NodeRegistry::new();
        let specs = vec![
            StaticNodeSpec::parse("127.0.0.1:1").unwrap(),
            StaticNodeSpec::parse("127.0.0.1:1").unwrap(),
        ];
        discover_static(&registry, &specs).await;
        assert_eq!(registry.len(), 1);
    }
}
