//! In-degree scheduler driving topological dispatch (§4.3).
//!
//! Holds no durable state of its own: it operates on an in-memory
//! `NodeId -> counter` map using atomic integers, since decrements race
//! across worker threads as sibling nodes complete concurrently.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use loom_core::NodeId;

use crate::dag::DependencyGraph;
use crate::edge::Edge;
use crate::node::Node;

/// A concurrent map of remaining in-degree counters, one per node.
#[derive(Debug, Default)]
pub struct InDegreeMap {
    counters: DashMap<NodeId, AtomicI64>,
}

impl InDegreeMap {
    #[must_use]
    pub fn current(&self, id: &NodeId) -> i64 {
        self.counters
            .get(id)
            .map_or(0, |c| c.load(Ordering::SeqCst))
    }

    /// Immutable point-in-time copy, suitable for checkpointing (§4.7).
    #[must_use]
    pub fn snapshot(&self) -> HashMap<NodeId, u32> {
        self.counters
            .iter()
            .map(|entry| {
                let count = entry.value().load(Ordering::SeqCst).max(0);
                (entry.key().clone(), count as u32)
            })
            .collect()
    }

    /// Re-materialize counters from a persisted snapshot.
    #[must_use]
    pub fn restore_from_snapshot(snapshot: &HashMap<NodeId, u32>) -> Self {
        let counters = DashMap::with_capacity(snapshot.len());
        for (id, count) in snapshot {
            counters.insert(id.clone(), AtomicI64::new(i64::from(*count)));
        }
        Self { counters }
    }
}

/// Initialize counters from the graph's incoming-edge counts (§4.3
/// `calculateInDegrees`).
#[must_use]
pub fn calculate_in_degrees(graph: &DependencyGraph<'_>) -> InDegreeMap {
    let counters = DashMap::new();
    for id in graph.order() {
        counters.insert(id.clone(), AtomicI64::new(i64::from(graph.in_edges(id).len() as u32)));
    }
    InDegreeMap { counters }
}

/// Enabled nodes whose counter is zero and which have not already
/// completed, in definition order (the scheduler's determinism guarantee).
#[must_use]
pub fn find_ready_nodes<'a>(
    graph: &DependencyGraph<'a>,
    in_degrees: &InDegreeMap,
    completed: &HashSet<NodeId>,
) -> Vec<&'a Node> {
    graph
        .order()
        .iter()
        .filter_map(|id| graph.get_node(id))
        .filter(|n| n.enabled)
        .filter(|n| !completed.contains(&n.id))
        .filter(|n| in_degrees.current(&n.id) <= 0)
        .collect()
}

/// The outcome of completing one node (§4.3 `nodeCompleted`): which
/// successors became ready, and which were marked skipped because their
/// only live incoming edge evaluated false.
#[derive(Debug, Default, Clone)]
pub struct CompletionOutcome {
    pub became_ready: Vec<NodeId>,
    pub skipped: Vec<NodeId>,
}

/// Atomically decrement the in-degree counter of every successor of
/// `node_id`. `condition_holds` decides whether a given outgoing edge is
/// "live"; edges failing it still decrement (so the successor's in-degree
/// still reaches zero) but route the successor into `skipped` instead of
/// `became_ready`, letting the dispatcher avoid invoking its executor.
pub fn node_completed(
    graph: &DependencyGraph<'_>,
    node_id: &NodeId,
    in_degrees: &InDegreeMap,
    mut condition_holds: impl FnMut(&Edge) -> bool,
) -> CompletionOutcome {
    let mut outcome = CompletionOutcome::default();
    for edge in graph.out_edges(node_id) {
        let counter = in_degrees
            .counters
            .entry(edge.target_id.clone())
            .or_insert_with(|| AtomicI64::new(0));
        let remaining = counter.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining <= 0 {
            if condition_holds(edge) {
                outcome.became_ready.push(edge.target_id.clone());
            } else {
                outcome.skipped.push(edge.target_id.clone());
            }
        }
    }
    outcome
}

/// Kahn's algorithm. Errors (returns `None`) if the graph has a cycle.
#[must_use]
pub fn topological_sort(graph: &DependencyGraph<'_>) -> Option<Vec<NodeId>> {
    let mut remaining: HashMap<NodeId, i64> = graph
        .order()
        .iter()
        .map(|id| (id.clone(), i64::from(graph.in_edges(id).len() as u32)))
        .collect();

    let mut queue: VecDeque<NodeId> = graph
        .order()
        .iter()
        .filter(|id| remaining[*id] == 0)
        .cloned()
        .collect();

    let mut sorted = Vec::with_capacity(graph.order().len());
    while let Some(id) = queue.pop_front() {
        sorted.push(id.clone());
        for edge in graph.out_edges(&id) {
            let counter = remaining.get_mut(&edge.target_id).expect("known node");
            *counter -= 1;
            if *counter == 0 {
                queue.push_back(edge.target_id.clone());
            }
        }
    }

    if sorted.len() == graph.order().len() {
        Some(sorted)
    } else {
        None
    }
}

/// Longest-path depth from any start node, for display/telemetry (§4.3
/// `calculateLevels`). Start nodes sit at level 0.
#[must_use]
pub fn calculate_levels(graph: &DependencyGraph<'_>) -> HashMap<NodeId, u32> {
    let order = match topological_sort(graph) {
        Some(order) => order,
        None => return HashMap::new(),
    };

    let mut levels: HashMap<NodeId, u32> = HashMap::with_capacity(order.len());
    for id in &order {
        let level = graph
            .in_edges(id)
            .iter()
            .map(|e| levels.get(&e.source_id).copied().unwrap_or(0) + 1)
            .max()
            .unwrap_or(0);
        levels.insert(id.clone(), level);
    }
    levels
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as Map;

    use loom_core::NodeType;

    use super::*;

    fn node(id: &str) -> Node {
        Node {
            id: NodeId::new(id).unwrap(),
            node_type: NodeType::Log,
            name: id.to_string(),
            config: Map::new(),
            retry_count: 0,
            timeout_ms: 30_000,
            enabled: true,
        }
    }

    fn edge(src: &str, dst: &str) -> Edge {
        Edge::new(NodeId::new(src).unwrap(), NodeId::new(dst).unwrap())
    }

    #[test]
    fn linear_pipeline_ready_set_progresses_one_at_a_time() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c")];
        let graph = DependencyGraph::new(&nodes, &edges);
        let degrees = calculate_in_degrees(&graph);
        let mut completed = HashSet::new();

        let ready = find_ready_nodes(&graph, &degrees, &completed);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, NodeId::new("a").unwrap());

        completed.insert(NodeId::new("a").unwrap());
        let outcome = node_completed(&graph, &NodeId::new("a").unwrap(), &degrees, |_| true);
        assert_eq!(outcome.became_ready, vec![NodeId::new("b").unwrap()]);

        let ready = find_ready_nodes(&graph, &degrees, &completed);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, NodeId::new("b").unwrap());
    }

    #[test]
    fn diamond_merge_becomes_ready_only_after_both_predecessors() {
        let nodes = vec![node("start"), node("a"), node("b"), node("merge")];
        let edges = vec![
            edge("start", "a"),
            edge("start", "b"),
            edge("a", "merge"),
            edge("b", "merge"),
        ];
        let graph = DependencyGraph::new(&nodes, &edges);
        let degrees = calculate_in_degrees(&graph);
        assert_eq!(degrees.current(&NodeId::new("merge").unwrap()), 2);

        let outcome_a = node_completed(&graph, &NodeId::new("a").unwrap(), &degrees, |_| true);
        assert!(outcome_a.became_ready.is_empty());
        assert_eq!(degrees.current(&NodeId::new("merge").unwrap()), 1);

        let outcome_b = node_completed(&graph, &NodeId::new("b").unwrap(), &degrees, |_| true);
        assert_eq!(outcome_b.became_ready, vec![NodeId::new("merge").unwrap()]);
    }

    #[test]
    fn false_condition_routes_successor_to_skipped_not_ready() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b")];
        let graph = DependencyGraph::new(&nodes, &edges);
        let degrees = calculate_in_degrees(&graph);
        let outcome = node_completed(&graph, &NodeId::new("a").unwrap(), &degrees, |_| false);
        assert!(outcome.became_ready.is_empty());
        assert_eq!(outcome.skipped, vec![NodeId::new("b").unwrap()]);
    }

    #[test]
    fn snapshot_restore_round_trips() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("a", "c")];
        let graph = DependencyGraph::new(&nodes, &edges);
        let degrees = calculate_in_degrees(&graph);
        let snap = degrees.snapshot();
        let restored = InDegreeMap::restore_from_snapshot(&snap);
        for id in graph.order() {
            assert_eq!(degrees.current(id), restored.current(id));
        }
    }

    #[test]
    fn topological_sort_respects_edge_order() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c")];
        let graph = DependencyGraph::new(&nodes, &edges);
        let order = topological_sort(&graph).expect("acyclic");
        let pos = |id: &str| order.iter().position(|n| n == &NodeId::new(id).unwrap()).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn topological_sort_fails_on_cycle() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b"), edge("b", "a")];
        let graph = DependencyGraph::new(&nodes, &edges);
        assert!(topological_sort(&graph).is_none());
    }

    #[test]
    fn levels_follow_longest_path_depth() {
        let nodes = vec![node("start"), node("a"), node("b"), node("merge")];
        let edges = vec![
            edge("start", "a"),
            edge("start", "b"),
            edge("a", "merge"),
            edge("b", "merge"),
        ];
        let graph = DependencyGraph::new(&nodes, &edges);
        let levels = calculate_levels(&graph);
        assert_eq!(levels[&NodeId::new("start").unwrap()], 0);
        assert_eq!(levels[&NodeId::new("a").unwrap()], 1);
        assert_eq!(levels[&NodeId::new("merge").unwrap()], 2);
    }
}
