use serde::{Deserialize, Serialize};

use crate::flow::EdgeCondition;

/// A directed transition between two nodes as it appears on the wire.
///
/// An edge without a condition (or with an `auto` condition) is followed
/// unconditionally; `decision` and `question` conditions gate the transition
/// on the learner's input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeModel {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<EdgeCondition>,
}
