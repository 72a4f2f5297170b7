//! Node Registry (spec §4.3): an in-memory map `NodeId -> Node` with
//! copy-on-read snapshots. `dashmap` gives per-shard locking so mutations
//! (health update, resource update, request counters) don't block readers
//! taking a snapshot of an unrelated node, matching the teacher's use of
//! `dashmap` for concurrent state (`dashflow`'s checkpoint/executor
//! modules).

use dashmap::DashMap;
use hydra_core::node::{Node, NodeId};

/// Thread-safe registry of discovered nodes. Readers (the Router) see a
/// consistent snapshot of all fields relevant to selection; a snapshot is
/// a clone taken under the per-shard lock, so it never observes a
/// torn write.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: DashMap<NodeId, Node>,
}

impl NodeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a newly discovered node, or replaces an existing one with
    /// the same id. Duplicates by `(host, port)` are the caller's
    /// responsibility to collapse before calling this (see `discovery`).
    pub fn upsert(&self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    #[must_use]
    pub fn snapshot(&self, id: &NodeId) -> Option<Node> {
        self.nodes.get(id).map(|n| n.clone())
    }

    /// A consistent snapshot of every known node, for the Router to score.
    #[must_use]
    pub fn all_snapshots(&self) -> Vec<Node> {
        self.nodes.iter().map(|entry| entry.value().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Permanently removes a node (spec §3: "removed when marked
    /// permanently unreachable").
    pub fn remove(&self, id: &NodeId) {
        self.nodes.remove(id);
    }

    pub fn mutate<F>(&self, id: &NodeId, f: F)
    where
        F: FnOnce(&mut Node),
    {
        if let Some(mut entry) = self.nodes.get_mut(id) {
            f(entry.value_mut());
        }
    }

    /// Reserves a request slot on `id`, returning `true` if
    /// `active_requests < max_concurrent` and the slot was taken (spec
    /// §4.5 "Concurrency").
    #[must_use]
    pub fn try_acquire_slot(&self, id: &NodeId) -> bool {
        self.nodes
            .get_mut(id)
            .map(|mut entry| {
                let node = entry.value_mut();
                if node.active_requests < node.max_concurrent {
                    node.active_requests += 1;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false)
    }

    pub fn release_slot(&self, id: &NodeId) {
        if let Some(mut entry) = self.nodes.get_mut(id) {
            let node = entry.value_mut();
            node.active_requests = node.active_requests.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_core::node::NodeKind;

    fn node(id: &str) -> Node {
        Node::new(id, "localhost", 11434, NodeKind::Gpu)
    }

    #[test]
    fn upsert_then_snapshot_round_trips() {
        let registry = NodeRegistry::new();
        registry.upsert(node("a"));
        let snap = registry.snapshot(&NodeId::new("a")).unwrap();
        assert_eq!(snap.id, NodeId::new("a"));
    }

    #[test]
    fn slot_acquisition_respects_max_concurrent() {
        let registry = NodeRegistry::new();
        let mut n = node("a");
        n.max_concurrent = 1;
        registry.upsert(n);
        let id = NodeId::new("a");
        assert!(registry.try_acquire_slot(&id));
        assert!(!registry.try_acquire_slot(&id));
        registry.release_slot(&id);
        assert!(registry.try_acquire_slot(&id));
    }

    #[test]
    fn remove_drops_node() {
        let registry = NodeRegistry::new();
        registry.upsert(node("a"));
        registry.remove(&NodeId::new("a"));
        assert!(!registry.contains(&NodeId::new("a")));
    }
}
