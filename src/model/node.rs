use serde::{Deserialize, Serialize};

use crate::flow::NodeKind;

/// Canvas coordinates of a node in the authoring UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Canvas extent of a node in the authoring UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    #[serde(default)]
    pub w: f64,
    #[serde(default)]
    pub h: f64,
}

/// A single step of a training flow as it appears on the wire.
///
/// `data` is the kind-specific payload, carried opaquely here and parsed into
/// a typed [`crate::flow::NodeContent`] when a runtime node is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeModel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub position: Position,
    #[serde(flatten)]
    pub size: Size,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl NodeModel {
    /// The learner-facing message body, if the payload carries one.
    ///
    /// Accepts both the `message` key and the authoring-draft `draft` key.
    pub fn message(&self) -> Option<&str> {
        self.data.get("message").or_else(|| self.data.get("draft")).and_then(|v| v.as_str())
    }

    /// Answer choices of a question payload; empty for other kinds.
    pub fn choices(&self) -> Vec<&str> {
        self.data.get("choices").and_then(|v| v.as_array()).map(|arr| arr.iter().filter_map(|v| v.as_str()).collect()).unwrap_or_default()
    }
}
