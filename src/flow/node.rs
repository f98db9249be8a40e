use serde::{Deserialize, Serialize};

use crate::{Result, TrainflowError, flow::content::NodeContent, model::NodeModel};

/// node id
pub type NodeId = String;

/// The kind of a flow node.
///
/// Markers (`start`/`end`) delimit the script, content kinds deliver
/// material to the learner, and interactive kinds (`question`, `decision`,
/// `assessment`) wait for learner input before the flow moves on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Start,
    #[default]
    Text,
    Image,
    Audio,
    Video,
    Question,
    Decision,
    Feedback,
    Assessment,
    /// Terminal marker; the wire also accepts the legacy `completion` name.
    #[serde(alias = "completion")]
    End,
}

impl NodeKind {
    /// Start/end delimiters.
    pub fn is_marker(&self) -> bool {
        matches!(self, NodeKind::Start | NodeKind::End)
    }

    /// Kinds that pause the session until the learner answers.
    pub fn is_interactive(&self) -> bool {
        matches!(self, NodeKind::Question | NodeKind::Decision | NodeKind::Assessment)
    }

    /// Kinds whose payload carries a learner-facing message body.
    pub fn carries_message(&self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::Image | NodeKind::Audio | NodeKind::Video | NodeKind::Feedback)
    }
}

/// Typed runtime node: a wire [`NodeModel`] with its payload parsed and
/// checked against the kind's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// node id
    pub id: NodeId,
    /// node kind
    pub kind: NodeKind,
    /// node label shown in the authoring UI
    pub label: String,
    /// kind-specific payload
    pub content: NodeContent,
}

impl Node {
    pub fn new(model: &NodeModel) -> Result<Self> {
        let content =
            NodeContent::parse(model.kind, &model.data).map_err(|e| TrainflowError::Node(format!("invalid node \"{}\": {}", model.id, e)))?;

        Ok(Self {
            id: model.id.clone(),
            kind: model.kind,
            label: model.label.clone(),
            content,
        })
    }
}
