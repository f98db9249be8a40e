//! Flow edge definitions for connecting nodes.
//!
//! Edges define the transition order between nodes, optionally gated by a
//! condition on the learner's input (a picked decision branch or a keyword
//! match on a free-text answer).

use serde::{Deserialize, Serialize};

use crate::{flow::node::NodeId, model::EdgeModel};

/// Unique identifier for an edge within a flow.
pub type EdgeId = String;

/// What an edge condition inspects.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConditionKind {
    /// Always taken; equivalent to no condition.
    #[default]
    Auto,
    /// Taken when the learner picked the matching decision branch.
    Decision,
    /// Taken when the learner's answer matches the keyword set.
    Question,
}

/// How a question condition combines its keywords.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConditionLogic {
    /// Every keyword must appear in the answer.
    #[default]
    And,
    /// At least one keyword must appear.
    Or,
    /// No keyword may appear.
    Not,
}

/// Condition gating a transition.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCondition {
    #[serde(rename = "type", default)]
    pub kind: ConditionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_key: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub logic: ConditionLogic,
}

/// Typed runtime edge connecting two nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Edge {
    /// Unique edge identifier.
    pub id: EdgeId,
    /// ID of the source node.
    pub from: NodeId,
    /// ID of the target node.
    pub to: NodeId,
    /// Optional label shown on the canvas.
    pub label: Option<String>,
    /// Optional transition condition.
    pub condition: Option<EdgeCondition>,
}

impl Edge {
    /// Whether this edge is followed without inspecting learner input.
    pub fn is_unconditional(&self) -> bool {
        match &self.condition {
            None => true,
            Some(cond) => cond.kind == ConditionKind::Auto,
        }
    }
}

impl From<&EdgeModel> for Edge {
    fn from(model: &EdgeModel) -> Self {
        Self {
            id: model.id.clone(),
            from: model.from.clone(),
            to: model.to.clone(),
            label: model.label.clone(),
            condition: model.condition.clone(),
        }
    }
}
