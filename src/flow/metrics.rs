//! Structural metrics over a flow: complexity class, duration estimate, and
//! aggregate stats for the authoring UI.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    flow::node::NodeKind,
    model::{EdgeModel, NodeModel},
};

/// Characters of message content that cost roughly one minute of reading.
const CHARS_PER_MINUTE: f64 = 200.0;
/// Minutes added per edge for navigation overhead.
const EDGE_OVERHEAD: f64 = 0.2;

/// Coarse structural bucket derived from total node+edge count.
///
/// UI hinting only; nothing branches on it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Complexity {
    #[default]
    Low,
    Medium,
    High,
}

/// Aggregate stats for a node/edge set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub node_type_counts: HashMap<NodeKind, usize>,
    pub avg_connections_per_node: f64,
    pub complexity: Complexity,
}

/// Bucket a graph size into a complexity class.
pub fn complexity_for(
    node_count: usize,
    edge_count: usize,
) -> Complexity {
    match node_count + edge_count {
        0..=10 => Complexity::Low,
        11..=30 => Complexity::Medium,
        _ => Complexity::High,
    }
}

/// Estimated minutes a learner spends on a single node.
fn node_weight(node: &NodeModel) -> f64 {
    match node.kind {
        NodeKind::Start | NodeKind::End => 0.5,
        NodeKind::Question => 2.0,
        NodeKind::Decision => 1.0,
        NodeKind::Assessment => 3.0,
        NodeKind::Text => {
            let chars = node.message().map(|m| m.chars().count()).unwrap_or(0);
            (chars as f64 / CHARS_PER_MINUTE).max(1.0)
        }
        _ => 1.0,
    }
}

/// Estimated completion time in whole minutes, rounded up.
pub fn estimate_duration(
    nodes: &[NodeModel],
    edges: &[EdgeModel],
) -> u32 {
    let total: f64 = nodes.iter().map(node_weight).sum::<f64>() + EDGE_OVERHEAD * edges.len() as f64;
    total.ceil() as u32
}

/// Mean number of edges per node; 0 for an empty flow.
pub fn avg_connections_per_node(
    nodes: &[NodeModel],
    edges: &[EdgeModel],
) -> f64 {
    if nodes.is_empty() {
        0.0
    } else {
        edges.len() as f64 / nodes.len() as f64
    }
}

/// Aggregate stats over a node/edge set.
pub fn flow_stats(
    nodes: &[NodeModel],
    edges: &[EdgeModel],
) -> FlowStats {
    let mut node_type_counts: HashMap<NodeKind, usize> = HashMap::new();
    for node in nodes {
        *node_type_counts.entry(node.kind).or_insert(0) += 1;
    }

    FlowStats {
        total_nodes: nodes.len(),
        total_edges: edges.len(),
        node_type_counts,
        avg_connections_per_node: avg_connections_per_node(nodes, edges),
        complexity: complexity_for(nodes.len(), edges.len()),
    }
}
