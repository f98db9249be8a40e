//! Kind-specific node payloads.
//!
//! Each payload is checked against a JSON Schema before deserialization, so
//! a malformed authoring payload is rejected as an input error long before
//! the validator or a session ever sees the node. The schemas type-check the
//! known keys but require none of them — missing content is a validator
//! finding, not an input error.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{Result, flow::node::NodeKind};

/// Payload of message-bearing nodes (text, image, audio, video, feedback).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    /// Learner-facing body; authoring clients may still call it `draft`.
    #[serde(default, alias = "draft")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

/// Payload of a question node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionContent {
    #[serde(default, alias = "draft")]
    pub message: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// One branching rule of a decision node. Authoring data for the UI; the
/// runtime branches on the outgoing edges' `choiceKey` conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionRule {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub action: String,
}

/// Payload of a decision node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionContent {
    #[serde(default)]
    pub conditions: Vec<DecisionRule>,
}

/// Answer constraints of an assessment node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerValidation {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regular expression the answer must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Payload of an assessment node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentContent {
    #[serde(default, alias = "draft")]
    pub message: String,
    #[serde(default)]
    pub validation: AnswerValidation,
}

/// Parsed node payload, keyed by the node's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    /// Start/end markers carry no payload.
    Marker,
    Message(MessageContent),
    Question(QuestionContent),
    Decision(DecisionContent),
    Assessment(AssessmentContent),
}

impl NodeContent {
    /// Parse and schema-check a wire payload for the given kind.
    pub fn parse(
        kind: NodeKind,
        data: &Value,
    ) -> Result<Self> {
        let data = if data.is_null() {
            json!({})
        } else {
            data.clone()
        };

        match kind {
            NodeKind::Start | NodeKind::End => Ok(NodeContent::Marker),
            NodeKind::Question => {
                jsonschema::validate(&data, &question_schema())?;
                Ok(NodeContent::Question(serde_json::from_value(data)?))
            }
            NodeKind::Decision => {
                jsonschema::validate(&data, &decision_schema())?;
                Ok(NodeContent::Decision(serde_json::from_value(data)?))
            }
            NodeKind::Assessment => {
                jsonschema::validate(&data, &assessment_schema())?;
                Ok(NodeContent::Assessment(serde_json::from_value(data)?))
            }
            _ => {
                jsonschema::validate(&data, &message_schema())?;
                Ok(NodeContent::Message(serde_json::from_value(data)?))
            }
        }
    }

    /// The learner-facing message body, if this payload carries one.
    pub fn message(&self) -> Option<&str> {
        let message = match self {
            NodeContent::Marker => return None,
            NodeContent::Message(c) => &c.message,
            NodeContent::Question(c) => &c.message,
            NodeContent::Decision(_) => return None,
            NodeContent::Assessment(c) => &c.message,
        };
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }

    /// Answer choices offered to the learner; empty for non-question kinds.
    pub fn choices(&self) -> &[String] {
        match self {
            NodeContent::Question(c) => &c.choices,
            _ => &[],
        }
    }
}

fn message_schema() -> Value {
    serde_json::from_str(
        r#"{
        "type": "object",
        "properties": {
            "message": { "type": "string" },
            "draft": { "type": "string" },
            "mediaUrl": { "type": "string" }
        }
    }"#,
    )
    .unwrap()
}

fn question_schema() -> Value {
    serde_json::from_str(
        r#"{
        "type": "object",
        "properties": {
            "message": { "type": "string" },
            "draft": { "type": "string" },
            "choices": { "type": "array", "items": { "type": "string" } },
            "keywords": { "type": "array", "items": { "type": "string" } }
        }
    }"#,
    )
    .unwrap()
}

fn decision_schema() -> Value {
    serde_json::from_str(
        r#"{
        "type": "object",
        "properties": {
            "conditions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": { "type": "string" },
                        "value": { "type": "string" },
                        "action": { "type": "string" }
                    }
                }
            }
        }
    }"#,
    )
    .unwrap()
}

fn assessment_schema() -> Value {
    serde_json::from_str(
        r#"{
        "type": "object",
        "properties": {
            "message": { "type": "string" },
            "draft": { "type": "string" },
            "validation": {
                "type": "object",
                "properties": {
                    "required": { "type": "boolean" },
                    "minLength": { "type": "integer", "minimum": 0 },
                    "maxLength": { "type": "integer", "minimum": 0 },
                    "pattern": { "type": "string" }
                }
            }
        }
    }"#,
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_marker_ignores_payload() {
        let content = NodeContent::parse(NodeKind::Start, &json!({"anything": 1})).unwrap();
        assert_eq!(content, NodeContent::Marker);
    }

    #[test]
    fn test_message_accepts_draft_alias() {
        let content = NodeContent::parse(NodeKind::Text, &json!({"draft": "welcome"})).unwrap();
        assert_eq!(content.message(), Some("welcome"));
    }

    #[test]
    fn test_question_payload_parses() {
        let content = NodeContent::parse(NodeKind::Question, &json!({"choices": ["yes", "no"], "keywords": ["refund"]})).unwrap();
        assert_eq!(content.choices(), ["yes", "no"]);
    }

    #[test]
    fn test_question_rejects_non_string_choices() {
        let result = NodeContent::parse(NodeKind::Question, &json!({"choices": [1, 2]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_assessment_rejects_bad_validation_shape() {
        let result = NodeContent::parse(NodeKind::Assessment, &json!({"validation": {"minLength": "three"}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_null_payload_defaults_to_empty() {
        let content = NodeContent::parse(NodeKind::Text, &serde_json::Value::Null).unwrap();
        assert_eq!(content.message(), None);
    }
}
