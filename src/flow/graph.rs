//! Runtime flow representation using a directed graph.
//!
//! Wraps the wire model in a petgraph structure with an id index built once,
//! so node lookups and edge traversal stay O(1)/O(out-degree) instead of
//! rescanning the node list per step.

use std::collections::HashMap;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

use crate::{
    Result, TrainflowError,
    flow::{
        edge::Edge,
        node::{Node, NodeId, NodeKind},
    },
    model::FlowModel,
};

/// A validated-for-shape, ready-to-traverse flow graph.
///
/// Construction is strict: duplicate node ids and dangling edge endpoints
/// are input errors here. The validator has its own lenient pass that
/// reports those as findings instead; this type backs live sessions, which
/// must never see a malformed graph.
#[derive(Debug)]
pub struct FlowGraph {
    graph: DiGraph<Node, Edge>,
    index: HashMap<NodeId, NodeIndex>,
}

impl FlowGraph {
    /// Build the typed graph from a wire model.
    pub fn from_model(model: &FlowModel) -> Result<Self> {
        let mut graph: DiGraph<Node, Edge> = DiGraph::new();
        let mut index = HashMap::with_capacity(model.nodes.len());

        for node_model in model.nodes.iter() {
            let node = Node::new(node_model)?;
            if index.contains_key(&node.id) {
                return Err(TrainflowError::Node(format!("duplicate node id \"{}\"", node.id)));
            }
            let nid = node.id.clone();
            let node_idx = graph.add_node(node);
            index.insert(nid, node_idx);
        }
        for edge_model in model.edges.iter() {
            let edge = Edge::from(edge_model);
            let source = index.get(&edge.from).ok_or(TrainflowError::Edge(format!("source node \"{}\" not found", edge.from)))?;
            let target = index.get(&edge.to).ok_or(TrainflowError::Edge(format!("target node \"{}\" not found", edge.to)))?;
            graph.add_edge(*source, *target, edge);
        }

        Ok(Self {
            graph,
            index,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// get node by id
    pub fn node(
        &self,
        id: &str,
    ) -> Option<&Node> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    /// The unique entry node, when present.
    pub fn start_node(&self) -> Option<&Node> {
        self.graph.node_indices().map(|idx| &self.graph[idx]).find(|node| node.kind == NodeKind::Start)
    }

    /// get all node ids
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.graph.node_indices().map(|idx| self.graph[idx].id.clone()).collect()
    }

    /// Outgoing edges of a node in declaration order, with their targets.
    ///
    /// petgraph iterates outgoing edges newest-first, so the collected list
    /// is reversed to restore the order the author drew them in.
    pub fn outgoing(
        &self,
        id: &str,
    ) -> Vec<(&Edge, &Node)> {
        let Some(idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<(&Edge, &Node)> =
            self.graph.edges_directed(*idx, Direction::Outgoing).map(|edge_ref| (edge_ref.weight(), &self.graph[edge_ref.target()])).collect();
        edges.reverse();
        edges
    }

    pub fn out_degree(
        &self,
        id: &str,
    ) -> usize {
        self.index.get(id).map(|idx| self.graph.edges_directed(*idx, Direction::Outgoing).count()).unwrap_or(0)
    }

    pub fn in_degree(
        &self,
        id: &str,
    ) -> usize {
        self.index.get(id).map(|idx| self.graph.edges_directed(*idx, Direction::Incoming).count()).unwrap_or(0)
    }

    /// Whether the graph contains a directed cycle.
    pub fn has_cycle(&self) -> bool {
        let mut adjacency = vec![Vec::new(); self.graph.node_count()];
        for edge_ref in self.graph.edge_references() {
            adjacency[edge_ref.source().index()].push(edge_ref.target().index());
        }
        find_cycle(&adjacency).is_some()
    }
}

/// Find a directed cycle in an adjacency list, returning the positions along
/// it (first position repeated at the end), or `None` for an acyclic graph.
///
/// Iterative DFS with an explicit frame stack and per-position color state:
/// reaching a position that is still on the active path signals a cycle.
/// O(V+E) and safe on graphs far deeper than the thread stack would allow.
pub(crate) fn find_cycle(adjacency: &[Vec<usize>]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color = vec![Color::White; adjacency.len()];

    for root in 0..adjacency.len() {
        if color[root] != Color::White {
            continue;
        }
        color[root] = Color::Gray;
        // (position, next outgoing slot to visit)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let (v, slot) = *frame;
            if slot < adjacency[v].len() {
                frame.1 += 1;
                let w = adjacency[v][slot];
                match color[w] {
                    Color::White => {
                        color[w] = Color::Gray;
                        stack.push((w, 0));
                    }
                    Color::Gray => {
                        let entry = stack.iter().position(|(x, _)| *x == w).unwrap_or(0);
                        let mut cycle: Vec<usize> = stack[entry..].iter().map(|(x, _)| *x).collect();
                        cycle.push(w);
                        return Some(cycle);
                    }
                    Color::Black => {}
                }
            } else {
                color[v] = Color::Black;
                stack.pop();
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn flow(value: serde_json::Value) -> FlowModel {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_model_indexes_nodes() {
        let model = flow(json!({
            "nodes": [
                {"id": "n1", "type": "start", "label": "Begin"},
                {"id": "n2", "type": "end", "label": "Done"}
            ],
            "edges": [{"id": "e1", "from": "n1", "to": "n2"}]
        }));
        let graph = FlowGraph::from_model(&model).unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.start_node().unwrap().id, "n1");
        assert_eq!(graph.node_ids().len(), 2);
        assert_eq!(graph.out_degree("n1"), 1);
        assert_eq!(graph.in_degree("n2"), 1);
        assert!(!graph.has_cycle());
    }

    #[test]
    fn test_from_model_rejects_dangling_edge() {
        let model = flow(json!({
            "nodes": [{"id": "n1", "type": "start"}],
            "edges": [{"id": "e1", "from": "n1", "to": "missing"}]
        }));
        let err = FlowGraph::from_model(&model).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_from_model_rejects_duplicate_ids() {
        let model = flow(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n1", "type": "end"}
            ],
            "edges": []
        }));
        assert!(FlowGraph::from_model(&model).is_err());
    }

    #[test]
    fn test_outgoing_preserves_declaration_order() {
        let model = flow(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "text"},
                {"id": "n3", "type": "text"},
                {"id": "n4", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2"},
                {"id": "e2", "from": "n1", "to": "n3"},
                {"id": "e3", "from": "n2", "to": "n4"},
                {"id": "e4", "from": "n3", "to": "n4"}
            ]
        }));
        let graph = FlowGraph::from_model(&model).unwrap();
        let targets: Vec<&str> = graph.outgoing("n1").iter().map(|(_, node)| node.id.as_str()).collect();
        assert_eq!(targets, ["n2", "n3"]);
    }

    #[test]
    fn test_find_cycle_on_ring() {
        // 0 -> 1 -> 2 -> 0
        let adjacency = vec![vec![1], vec![2], vec![0]];
        let cycle = find_cycle(&adjacency).unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.len() >= 4);
    }

    #[test]
    fn test_find_cycle_none_on_dag() {
        let adjacency = vec![vec![1, 2], vec![3], vec![3], vec![]];
        assert!(find_cycle(&adjacency).is_none());
    }

    #[test]
    fn test_find_cycle_self_loop() {
        let adjacency = vec![vec![0]];
        assert_eq!(find_cycle(&adjacency), Some(vec![0, 0]));
    }

    #[test]
    fn test_find_cycle_large_chain_does_not_overflow() {
        // A 100k-node path would blow a recursive DFS; the explicit stack holds.
        let n = 100_000;
        let adjacency: Vec<Vec<usize>> = (0..n).map(|i| if i + 1 < n { vec![i + 1] } else { vec![] }).collect();
        assert!(find_cycle(&adjacency).is_none());
    }
}
