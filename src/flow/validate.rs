//! Structural validation of a flow graph.
//!
//! One implementation serves every caller: the publish gate runs it with the
//! strict default policy, interactive pre-submit checks can run it with the
//! advisory policy. The validator never fails — every finding comes back as
//! data, split into publish-blocking errors, non-blocking warnings, and
//! purely informational suggestions.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    flow::{graph::find_cycle, metrics, node::NodeKind},
    model::{EdgeModel, FlowSettings, NodeModel},
};

/// Message bodies longer than this draw a split-it-up suggestion.
const LONG_MESSAGE_CHARS: usize = 500;
/// Flows with fewer nodes than this draw a too-short suggestion.
const SHORT_FLOW_NODES: usize = 5;

/// How severe a policy-dependent finding is reported.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

/// Injectable severity table for findings whose weight depends on the
/// caller.
///
/// The default (strict) policy blocks publishing on a disallowed cycle; the
/// advisory policy downgrades it to a warning for interactive checks while
/// a trainer is still drawing the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub cycle_severity: Severity,
}

impl ValidationPolicy {
    /// Publish-gate policy: disallowed cycles block.
    pub fn strict() -> Self {
        Self {
            cycle_severity: Severity::Error,
        }
    }

    /// Pre-submit policy: disallowed cycles only warn.
    pub fn advisory() -> Self {
        Self {
            cycle_severity: Severity::Warning,
        }
    }
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Structural problems; any entry blocks publishing.
    pub errors: Vec<String>,
    /// Content problems worth fixing; never block anything.
    pub warnings: Vec<String>,
    /// Engagement/shape heuristics; informational only.
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    fn failed(error: String) -> Self {
        Self {
            is_valid: false,
            errors: vec![error],
            warnings: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

/// Validate a node/edge set against its settings.
///
/// Pure and deterministic: the same input always yields the same report,
/// and nothing is persisted or mutated.
pub fn validate_flow(
    nodes: &[NodeModel],
    edges: &[EdgeModel],
    settings: &FlowSettings,
    policy: &ValidationPolicy,
) -> ValidationReport {
    if nodes.is_empty() {
        return ValidationReport::failed("Flow must contain at least one node".to_string());
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    // Id index and adjacency are built once; every later rule is a lookup.
    let index: HashMap<&str, usize> = nodes.iter().enumerate().map(|(pos, node)| (node.id.as_str(), pos)).collect();
    if index.len() != nodes.len() {
        errors.push("Flow contains duplicate node ids".to_string());
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree = vec![0usize; nodes.len()];
    let mut out_degree = vec![0usize; nodes.len()];

    for edge in edges {
        let from = index.get(edge.from.as_str()).copied();
        let to = index.get(edge.to.as_str()).copied();

        if from.is_none() {
            errors.push(format!("Edge \"{}\" references unknown node \"{}\"", edge.id, edge.from));
        }
        if to.is_none() {
            errors.push(format!("Edge \"{}\" references unknown node \"{}\"", edge.id, edge.to));
        }
        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };

        adjacency[from].push(to);
        out_degree[from] += 1;
        in_degree[to] += 1;

        if from == to {
            warnings.push(format!("Edge \"{}\" loops back to its own node \"{}\"", edge.id, edge.from));
        }
    }

    let start_count = nodes.iter().filter(|node| node.kind == NodeKind::Start).count();
    match start_count {
        0 => errors.push("Flow must have a start node".to_string()),
        1 => {}
        n => errors.push(format!("Flow can only have one start node (found {})", n)),
    }

    let end_count = nodes.iter().filter(|node| node.kind == NodeKind::End).count();
    if end_count == 0 {
        errors.push("Flow must have at least one end node".to_string());
    }

    for (pos, node) in nodes.iter().enumerate() {
        match node.kind {
            NodeKind::Start => {
                if out_degree[pos] == 0 {
                    errors.push("Start node has no outgoing connections".to_string());
                }
            }
            NodeKind::End => {
                if in_degree[pos] == 0 {
                    errors.push(format!("End node \"{}\" has no incoming connections", display_name(node)));
                }
            }
            _ => {
                if in_degree[pos] == 0 && out_degree[pos] == 0 {
                    warnings.push(format!("Node \"{}\" is not connected to the flow", display_name(node)));
                }
            }
        }
    }

    if let Some(declared) = &settings.start_node {
        if !index.contains_key(declared.as_str()) {
            warnings.push(format!("Settings reference a start node \"{}\" that does not exist", declared));
        }
    }

    content_findings(nodes, &mut warnings, &mut suggestions);

    if !settings.allow_loops {
        if let Some(cycle) = find_cycle(&adjacency) {
            let path: Vec<&str> = cycle.iter().map(|pos| nodes[*pos].id.as_str()).collect();
            let message = format!("Flow contains a cycle ({}) but loops are not allowed", path.join(" -> "));
            match policy.cycle_severity {
                Severity::Error => errors.push(message),
                Severity::Warning => warnings.push(message),
            }
        }
    }

    if nodes.len() < SHORT_FLOW_NODES {
        suggestions.push("Flow is quite short; consider adding more steps to the training".to_string());
    }
    if !nodes.iter().any(|node| matches!(node.kind, NodeKind::Question | NodeKind::Decision)) {
        suggestions.push("Consider adding question or decision nodes to make the training interactive".to_string());
    }
    let avg = metrics::avg_connections_per_node(nodes, edges);
    if avg < 1.0 && nodes.len() > 1 {
        suggestions.push("Flow is sparsely connected; parts of it may be unreachable".to_string());
    } else if avg > 3.0 {
        suggestions.push("Flow branches heavily; consider simplifying its transitions".to_string());
    }

    trace!("validate_flow: {} errors, {} warnings, {} suggestions", errors.len(), warnings.len(), suggestions.len());

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        suggestions,
    }
}

/// Per-node content rules: empty bodies, under-specified questions, broken
/// assessment patterns, overlong messages.
fn content_findings(
    nodes: &[NodeModel],
    warnings: &mut Vec<String>,
    suggestions: &mut Vec<String>,
) {
    for node in nodes {
        match node.kind {
            NodeKind::Question => {
                if node.choices().len() < 2 {
                    warnings.push(format!("Question node \"{}\" should have at least 2 answer choices", display_name(node)));
                }
            }
            NodeKind::Assessment => {
                if let Some(pattern) = node.data.get("validation").and_then(|v| v.get("pattern")).and_then(|v| v.as_str()) {
                    if Regex::new(pattern).is_err() {
                        warnings.push(format!("Assessment node \"{}\" has an invalid answer pattern", display_name(node)));
                    }
                }
            }
            kind if kind.carries_message() => match node.message() {
                None | Some("") => warnings.push(format!("Node \"{}\" has no content", display_name(node))),
                Some(message) if message.chars().count() > LONG_MESSAGE_CHARS => {
                    suggestions.push(format!("Node \"{}\" has a long message; consider splitting it into smaller steps", display_name(node)));
                }
                Some(_) => {}
            },
            _ => {}
        }
    }
}

fn display_name(node: &NodeModel) -> &str {
    if node.label.is_empty() {
        &node.id
    } else {
        &node.label
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parts(value: serde_json::Value) -> (Vec<NodeModel>, Vec<EdgeModel>, FlowSettings) {
        let nodes = serde_json::from_value(value["nodes"].clone()).unwrap();
        let edges = serde_json::from_value(value["edges"].clone()).unwrap();
        let settings = if value["settings"].is_null() {
            FlowSettings::default()
        } else {
            serde_json::from_value(value["settings"].clone()).unwrap()
        };
        (nodes, edges, settings)
    }

    fn validate(value: serde_json::Value) -> ValidationReport {
        let (nodes, edges, settings) = parts(value);
        validate_flow(&nodes, &edges, &settings, &ValidationPolicy::default())
    }

    #[test]
    fn test_empty_flow_short_circuits() {
        let report = validate(json!({"nodes": [], "edges": []}));

        assert!(!report.is_valid);
        assert_eq!(report.errors, ["Flow must contain at least one node"]);
        assert!(report.warnings.is_empty());
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_minimal_flow_is_valid() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start", "label": "Begin"},
                {"id": "n2", "type": "end", "label": "Done"}
            ],
            "edges": [{"id": "e1", "from": "n1", "to": "n2"}]
        }));

        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_two_start_nodes_rejected() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "start"},
                {"id": "n3", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n3"},
                {"id": "e2", "from": "n2", "to": "n3"}
            ]
        }));

        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("only have one start node")));
    }

    #[test]
    fn test_missing_start_rejected() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "text", "data": {"message": "hi"}},
                {"id": "n2", "type": "end"}
            ],
            "edges": [{"id": "e1", "from": "n1", "to": "n2"}]
        }));

        assert!(report.errors.iter().any(|e| e.contains("must have a start node")));
    }

    #[test]
    fn test_start_only_flow_reports_both_errors() {
        let report = validate(json!({"nodes": [{"id": "n1", "type": "start"}], "edges": []}));

        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("Start node has no outgoing connections")));
        assert!(report.errors.iter().any(|e| e.contains("must have at least one end node")));
    }

    #[test]
    fn test_completion_counts_as_end() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "completion"}
            ],
            "edges": [{"id": "e1", "from": "n1", "to": "n2"}]
        }));

        assert!(report.is_valid);
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2"},
                {"id": "e2", "from": "n1", "to": "ghost"}
            ]
        }));

        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("unknown node \"ghost\"")));
    }

    #[test]
    fn test_end_without_incoming_rejected() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "end"},
                {"id": "n3", "type": "end", "label": "Stranded"}
            ],
            "edges": [{"id": "e1", "from": "n1", "to": "n2"}]
        }));

        assert!(report.errors.iter().any(|e| e.contains("Stranded") && e.contains("no incoming connections")));
    }

    #[test]
    fn test_orphan_node_warns() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "text", "data": {"message": "hi"}},
                {"id": "n3", "type": "end"}
            ],
            "edges": [{"id": "e1", "from": "n1", "to": "n3"}]
        }));

        assert!(report.is_valid);
        assert!(report.warnings.iter().any(|w| w.contains("n2") && w.contains("not connected")));
    }

    #[test]
    fn test_self_loop_warns() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "text", "data": {"message": "hi"}},
                {"id": "n3", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2"},
                {"id": "e2", "from": "n2", "to": "n2"},
                {"id": "e3", "from": "n2", "to": "n3"}
            ],
            "settings": {"allowLoops": true}
        }));

        assert!(report.is_valid);
        assert!(report.warnings.iter().any(|w| w.contains("loops back to its own node")));
    }

    #[test]
    fn test_ring_cycle_is_an_error_by_default() {
        let report = validate(json!({
            "nodes": [
                {"id": "a", "type": "start"},
                {"id": "b", "type": "text", "data": {"message": "b"}},
                {"id": "c", "type": "text", "data": {"message": "c"}},
                {"id": "d", "type": "text", "data": {"message": "d"}},
                {"id": "z", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "a", "to": "b"},
                {"id": "e2", "from": "b", "to": "c"},
                {"id": "e3", "from": "c", "to": "d"},
                {"id": "e4", "from": "d", "to": "b"},
                {"id": "e5", "from": "c", "to": "z"}
            ]
        }));

        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("cycle")));
    }

    #[test]
    fn test_cycle_allowed_when_loops_enabled() {
        let report = validate(json!({
            "nodes": [
                {"id": "a", "type": "start"},
                {"id": "b", "type": "text", "data": {"message": "b"}},
                {"id": "c", "type": "text", "data": {"message": "c"}},
                {"id": "d", "type": "text", "data": {"message": "d"}},
                {"id": "z", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "a", "to": "b"},
                {"id": "e2", "from": "b", "to": "c"},
                {"id": "e3", "from": "c", "to": "d"},
                {"id": "e4", "from": "d", "to": "b"},
                {"id": "e5", "from": "c", "to": "z"}
            ],
            "settings": {"allowLoops": true}
        }));

        assert!(report.is_valid);
        assert!(!report.errors.iter().any(|e| e.contains("cycle")));
        assert!(!report.warnings.iter().any(|w| w.contains("cycle")));
    }

    #[test]
    fn test_advisory_policy_downgrades_cycle() {
        let (nodes, edges, settings) = parts(json!({
            "nodes": [
                {"id": "a", "type": "start"},
                {"id": "b", "type": "text", "data": {"message": "b"}},
                {"id": "c", "type": "text", "data": {"message": "c"}},
                {"id": "z", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "a", "to": "b"},
                {"id": "e2", "from": "b", "to": "c"},
                {"id": "e3", "from": "c", "to": "b"},
                {"id": "e4", "from": "b", "to": "z"}
            ]
        }));

        let strict = validate_flow(&nodes, &edges, &settings, &ValidationPolicy::strict());
        let advisory = validate_flow(&nodes, &edges, &settings, &ValidationPolicy::advisory());

        assert!(!strict.is_valid);
        assert!(advisory.is_valid);
        assert!(advisory.warnings.iter().any(|w| w.contains("cycle")));
    }

    #[test]
    fn test_single_choice_question_warns_once() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "question", "data": {"choices": ["A"]}},
                {"id": "n3", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2"},
                {"id": "e2", "from": "n2", "to": "n3"}
            ]
        }));

        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("should have at least 2 answer choices"));
    }

    #[test]
    fn test_empty_text_content_warns() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "text", "label": "Intro", "data": {}},
                {"id": "n3", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2"},
                {"id": "e2", "from": "n2", "to": "n3"}
            ]
        }));

        assert!(report.warnings.iter().any(|w| w.contains("Intro") && w.contains("no content")));
    }

    #[test]
    fn test_invalid_assessment_pattern_warns() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "assessment", "data": {"validation": {"pattern": "[broken"}}},
                {"id": "n3", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2"},
                {"id": "e2", "from": "n2", "to": "n3"}
            ]
        }));

        assert!(report.is_valid);
        assert!(report.warnings.iter().any(|w| w.contains("invalid answer pattern")));
    }

    #[test]
    fn test_long_message_suggests_splitting() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "text", "data": {"message": "x".repeat(600)}},
                {"id": "n3", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2"},
                {"id": "e2", "from": "n2", "to": "n3"}
            ]
        }));

        assert!(report.suggestions.iter().any(|s| s.contains("splitting")));
    }

    #[test]
    fn test_no_interactive_nodes_suggests_engagement() {
        let report = validate(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "end"}
            ],
            "edges": [{"id": "e1", "from": "n1", "to": "n2"}]
        }));

        assert!(report.suggestions.iter().any(|s| s.contains("question or decision")));
        assert!(report.suggestions.iter().any(|s| s.contains("quite short")));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let fixture = json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "question", "data": {"choices": ["A"]}},
                {"id": "n3", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2"},
                {"id": "e2", "from": "n2", "to": "n3"}
            ]
        });

        assert_eq!(validate(fixture.clone()), validate(fixture));
    }
}
