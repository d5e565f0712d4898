//! The in-memory directed graph built from a [`WorkflowDefinition`].
//!
//! Per the design notes (§9), this is a hand-rolled two-adjacency-list
//! representation rather than a general-purpose graph library: a forward
//! map (`source -> outgoing edges`), a reverse map (`target -> incoming
//! edges`), and a node lookup keyed by id. Cycle detection is DFS with
//! three-color marking.

use std::collections::HashMap;

use loom_core::NodeId;

use crate::edge::Edge;
use crate::node::Node;
use crate::validate::ValidationError;

/// Forward/reverse adjacency view over a workflow's nodes and edges.
#[derive(Debug, Clone)]
pub struct DependencyGraph<'a> {
    nodes: HashMap<NodeId, &'a Node>,
    /// `source id -> edges leaving it`, insertion-ordered per source.
    out_edges: HashMap<NodeId, Vec<&'a Edge>>,
    /// `target id -> edges entering it`, insertion-ordered per target.
    in_edges: HashMap<NodeId, Vec<&'a Edge>>,
    /// Node ids in definition order — the scheduler's tie-break for
    /// simultaneously-ready nodes (§4.3).
    order: Vec<NodeId>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the adjacency view. Does not itself validate the graph;
    /// callers should run [`crate::validate::validate`] first for anything
    /// user-facing.
    #[must_use]
    pub fn new(nodes: &'a [Node], edges: &'a [Edge]) -> Self {
        let mut node_map = HashMap::with_capacity(nodes.len());
        let mut order = Vec::with_capacity(nodes.len());
        for n in nodes {
            node_map.insert(n.id.clone(), n);
            order.push(n.id.clone());
        }

        let mut out_edges: HashMap<NodeId, Vec<&Edge>> = HashMap::new();
        let mut in_edges: HashMap<NodeId, Vec<&Edge>> = HashMap::new();
        for e in edges {
            out_edges.entry(e.source_id.clone()).or_default().push(e);
            in_edges.entry(e.target_id.clone()).or_default().push(e);
        }

        Self {
            nodes: node_map,
            out_edges,
            in_edges,
            order,
        }
    }

    #[must_use]
    pub fn get_node(&self, id: &NodeId) -> Option<&'a Node> {
        self.nodes.get(id).copied()
    }

    #[must_use]
    pub fn out_edges(&self, id: &NodeId) -> &[&'a Edge] {
        self.out_edges.get(id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn in_edges(&self, id: &NodeId) -> &[&'a Edge] {
        self.in_edges.get(id).map_or(&[], Vec::as_slice)
    }

    /// Nodes in definition order.
    #[must_use]
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Nodes with in-degree zero.
    #[must_use]
    pub fn start_nodes(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .filter(|id| self.in_edges(id).is_empty())
            .cloned()
            .collect()
    }

    /// Nodes with out-degree zero.
    #[must_use]
    pub fn end_nodes(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .filter(|id| self.out_edges(id).is_empty())
            .cloned()
            .collect()
    }

    /// Initial in-degree of every node, counting only edges whose target
    /// exists (the caller is expected to validate endpoint integrity
    /// first).
    #[must_use]
    pub fn initial_in_degrees(&self) -> HashMap<NodeId, u32> {
        self.order
            .iter()
            .map(|id| (id.clone(), self.in_edges(id).len() as u32))
            .collect()
    }

    /// DFS cycle detection with three-color marking (white/gray/black).
    /// Returns the node ids participating in the first cycle found, in
    /// discovery order, or `None` if the graph is acyclic.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<NodeId>> {
        let mut color: HashMap<NodeId, Color> = self
            .order
            .iter()
            .map(|id| (id.clone(), Color::White))
            .collect();
        let mut stack: Vec<NodeId> = Vec::new();

        for start in &self.order {
            if color.get(start) != Some(&Color::White) {
                continue;
            }
            if let Some(cycle) = self.dfs_visit(start, &mut color, &mut stack) {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs_visit(
        &self,
        id: &NodeId,
        color: &mut HashMap<NodeId, Color>,
        stack: &mut Vec<NodeId>,
    ) -> Option<Vec<NodeId>> {
        color.insert(id.clone(), Color::Gray);
        stack.push(id.clone());

        for edge in self.out_edges(id) {
            let next = &edge.target_id;
            match color.get(next).copied().unwrap_or(Color::White) {
                Color::White => {
                    if let Some(cycle) = self.dfs_visit(next, color, stack) {
                        return Some(cycle);
                    }
                }
                Color::Gray => {
                    // Back edge: the cycle is the portion of the stack from
                    // `next`'s first occurrence to the top, plus `next` again
                    // to close the loop for readability.
                    let start_idx = stack.iter().position(|n| n == next).unwrap_or(0);
                    let mut cycle: Vec<NodeId> = stack[start_idx..].to_vec();
                    cycle.push(next.clone());
                    return Some(cycle);
                }
                Color::Black => {}
            }
        }

        stack.pop();
        color.insert(id.clone(), Color::Black);
        None
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Run the first four structural checks a [`DependencyGraph`] can answer on
/// its own (endpoint integrity, self-loops, cycles, isolated nodes). Called
/// by [`crate::validate::validate`] after the cheaper per-node checks.
pub(crate) fn check_structure(
    nodes: &[Node],
    edges: &[Edge],
) -> Result<(), ValidationError> {
    let known: std::collections::HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();
    for edge in edges {
        if !known.contains(&edge.source_id) {
            return Err(ValidationError::UnknownEdgeEndpoint {
                node_id: edge.source_id.clone(),
            });
        }
        if !known.contains(&edge.target_id) {
            return Err(ValidationError::UnknownEdgeEndpoint {
                node_id: edge.target_id.clone(),
            });
        }
        if edge.is_self_loop() {
            return Err(ValidationError::SelfLoop {
                node_id: edge.source_id.clone(),
            });
        }
    }

    let graph = DependencyGraph::new(nodes, edges);
    if let Some(cycle) = graph.find_cycle() {
        return Err(ValidationError::CycleDetected { nodes: cycle });
    }

    if nodes.len() > 1 {
        for node in nodes {
            let isolated =
                graph.in_edges(&node.id).is_empty() && graph.out_edges(&node.id).is_empty();
            if isolated {
                return Err(ValidationError::IsolatedNode {
                    node_id: node.id.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use loom_core::NodeType;

    use super::*;
    use std::collections::HashMap as Map;

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
    fn in_degrees_match_incoming_edge_counts() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "c")];
        let graph = DependencyGraph::new(&nodes, &edges);
        let degrees = graph.initial_in_degrees();
        assert_eq!(degrees[&NodeId::new("a").unwrap()], 0);
        assert_eq!(degrees[&NodeId::new("b").unwrap()], 1);
        assert_eq!(degrees[&NodeId::new("c").unwrap()], 2);
    }

    #[test]
    fn start_and_end_nodes_are_in_and_out_degree_zero() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c")];
        let graph = DependencyGraph::new(&nodes, &edges);
        assert_eq!(graph.start_nodes(), vec![NodeId::new("a").unwrap()]);
        assert_eq!(graph.end_nodes(), vec![NodeId::new("c").unwrap()]);
    }

    #[test]
    fn detects_a_cycle() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b"), edge("b", "a")];
        let graph = DependencyGraph::new(&nodes, &edges);
        let cycle = graph.find_cycle().expect("cycle expected");
        assert!(cycle.contains(&NodeId::new("a").unwrap()));
        assert!(cycle.contains(&NodeId::new("b").unwrap()));
    }

    #[test]
    fn acyclic_graph_has_no_cycle() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "c")];
        let graph = DependencyGraph::new(&nodes, &edges);
        assert!(graph.find_cycle().is_none());
    }
}
