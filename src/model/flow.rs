use serde::{Deserialize, Serialize};

use crate::{
    Result, TrainflowError,
    flow::metrics::{self, Complexity},
    model::{EdgeModel, NodeModel},
};

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_max_depth() -> usize {
    10
}

/// Traversal settings for a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSettings {
    /// Declared entry node; informational, the start node is identified by
    /// its kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_node: Option<String>,
    #[serde(default)]
    pub end_nodes: Vec<String>,
    /// Step budget multiplier for a session walking this flow.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub allow_loops: bool,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            start_node: None,
            end_nodes: Vec::new(),
            max_depth: default_max_depth(),
            allow_loops: false,
        }
    }
}

/// Derived flow metadata, recomputed by [`FlowModel::normalize`] and never
/// set by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMetadata {
    #[serde(default)]
    pub total_nodes: usize,
    #[serde(default)]
    pub total_edges: usize,
    #[serde(default)]
    pub complexity: Complexity,
    /// Estimated completion time in whole minutes.
    #[serde(default)]
    pub estimated_duration: u32,
}

/// A versioned training flow: the full node/edge graph plus settings and
/// derived metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub trainer_id: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<NodeModel>,
    pub edges: Vec<EdgeModel>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub settings: FlowSettings,
    #[serde(default)]
    pub metadata: FlowMetadata,
}

impl FlowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        let flow = serde_json::from_str::<FlowModel>(s);
        match flow {
            Ok(v) => Ok(v),
            Err(e) => Err(TrainflowError::Flow(format!("{}", e))),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Recompute the derived metadata from the current node/edge lists.
    ///
    /// Called on every mutation before the flow is persisted, so the stored
    /// counts, complexity class and duration estimate always reflect the
    /// actual graph.
    pub fn normalize(&mut self) {
        self.metadata = FlowMetadata {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            complexity: metrics::complexity_for(self.nodes.len(), self.edges.len()),
            estimated_duration: metrics::estimate_duration(&self.nodes, &self.edges),
        };
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::flow::metrics::Complexity;

    #[test]
    fn test_wire_shape_roundtrip() {
        let payload = json!({
            "id": "f1",
            "trainerId": "t1",
            "name": "Onboarding",
            "nodes": [
                {"id": "n1", "type": "start", "label": "Begin", "x": 0, "y": 0, "w": 200, "h": 100, "data": {}},
                {"id": "n2", "type": "end", "label": "Done"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2", "condition": {"type": "auto", "logic": "and"}}
            ],
            "settings": {"startNode": "n1", "endNodes": ["n2"], "maxDepth": 10, "allowLoops": false}
        });

        let flow = FlowModel::from_json(&payload.to_string()).unwrap();

        assert_eq!(flow.trainer_id, "t1");
        assert_eq!(flow.nodes[0].position.x, 0.0);
        assert_eq!(flow.nodes[0].size.w, 200.0);
        assert_eq!(flow.settings.start_node.as_deref(), Some("n1"));
        assert!(!flow.settings.allow_loops);
        assert!(flow.edges[0].condition.is_some());

        // Flattened coordinates survive serialization.
        let round = serde_json::to_value(&flow).unwrap();
        assert_eq!(round["nodes"][0]["w"], json!(200.0));
        assert_eq!(round["settings"]["maxDepth"], json!(10));
    }

    #[test]
    fn test_from_json_rejects_non_array_nodes() {
        let err = FlowModel::from_json(r#"{"nodes": "nope", "edges": []}"#).unwrap_err();
        assert!(matches!(err, TrainflowError::Flow(_)));
    }

    #[test]
    fn test_from_json_rejects_unknown_node_kind() {
        let payload = json!({
            "nodes": [{"id": "n1", "type": "teleport"}],
            "edges": []
        });
        assert!(FlowModel::from_json(&payload.to_string()).is_err());
    }

    #[test]
    fn test_normalize_overwrites_hand_set_metadata() {
        let mut flow = FlowModel::from_json(
            &json!({
                "nodes": [
                    {"id": "n1", "type": "start"},
                    {"id": "n2", "type": "end"}
                ],
                "edges": [{"id": "e1", "from": "n1", "to": "n2"}],
                "metadata": {"totalNodes": 42, "totalEdges": 42, "complexity": "high", "estimatedDuration": 999}
            })
            .to_string(),
        )
        .unwrap();

        flow.normalize();

        assert_eq!(flow.metadata.total_nodes, 2);
        assert_eq!(flow.metadata.total_edges, 1);
        assert_eq!(flow.metadata.complexity, Complexity::Low);
        assert_eq!(flow.metadata.estimated_duration, 2);
    }

    #[test]
    fn test_settings_defaults() {
        let flow = FlowModel::from_json(r#"{"nodes": [], "edges": []}"#).unwrap();
        assert_eq!(flow.settings.max_depth, 10);
        assert!(!flow.settings.allow_loops);
        assert_eq!(flow.version, "1.0.0");
    }
}
