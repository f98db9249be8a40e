//! Edge condition evaluation against learner input.
//!
//! Pure predicates used by the session runtime to pick the next transition,
//! following the short-circuit style of case selection: conditional edges
//! are tried in declaration order and the first match wins.

use regex::Regex;

use crate::flow::{
    content::AnswerValidation,
    edge::{ConditionKind, ConditionLogic, Edge},
};

/// Whether `edge` accepts the learner input.
pub fn edge_accepts(
    edge: &Edge,
    input: &str,
) -> bool {
    let Some(condition) = &edge.condition else {
        return true;
    };
    match condition.kind {
        ConditionKind::Auto => true,
        ConditionKind::Decision => condition.choice_key.as_deref().map(|key| key == input.trim()).unwrap_or(false),
        ConditionKind::Question => keyword_match(&condition.keywords, condition.logic, input),
    }
}

/// Combine case-insensitive substring hits over the keyword set.
///
/// `and` requires every keyword, `or` at least one, `not` none. An empty
/// keyword set follows the usual fold identities: `and`/`not` hold
/// vacuously, `or` does not.
pub fn keyword_match(
    keywords: &[String],
    logic: ConditionLogic,
    input: &str,
) -> bool {
    let haystack = input.to_lowercase();
    let mut hits = keywords.iter().map(|keyword| haystack.contains(&keyword.to_lowercase()));

    match logic {
        ConditionLogic::And => hits.all(|hit| hit),
        ConditionLogic::Or => hits.any(|hit| hit),
        ConditionLogic::Not => !hits.any(|hit| hit),
    }
}

/// Check a learner answer against an assessment's constraints.
///
/// Returns the learner-facing rejection reason, or `None` when the answer
/// passes. An invalid `pattern` never rejects here; the validator reports it
/// to the author instead.
pub fn check_answer(
    validation: &AnswerValidation,
    input: &str,
) -> Option<String> {
    let answer = input.trim();

    if validation.required && answer.is_empty() {
        return Some("An answer is required".to_string());
    }
    if let Some(min) = validation.min_length {
        if answer.chars().count() < min {
            return Some(format!("Answer must be at least {} characters", min));
        }
    }
    if let Some(max) = validation.max_length {
        if answer.chars().count() > max {
            return Some(format!("Answer must be at most {} characters", max));
        }
    }
    if let Some(pattern) = &validation.pattern {
        if let Ok(re) = Regex::new(pattern) {
            if !re.is_match(answer) {
                return Some("Answer does not match the expected format".to_string());
            }
        }
    }

    None
}

/// Pick the next transition among `edges` (declaration order).
///
/// Conditional edges are evaluated first; the first unconditional edge is
/// the fallback when none match. `None` means the input matched nothing and
/// the caller should re-prompt.
pub fn pick_edge<'a, T>(
    edges: &'a [(&'a Edge, T)],
    input: &str,
) -> Option<&'a (&'a Edge, T)> {
    edges
        .iter()
        .filter(|(edge, _)| !edge.is_unconditional())
        .find(|(edge, _)| edge_accepts(edge, input))
        .or_else(|| edges.iter().find(|(edge, _)| edge.is_unconditional()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::edge::EdgeCondition;

    fn question_edge(keywords: &[&str], logic: ConditionLogic) -> Edge {
        Edge {
            id: "e1".to_string(),
            from: "a".to_string(),
            to: "b".to_string(),
            label: None,
            condition: Some(EdgeCondition {
                kind: ConditionKind::Question,
                choice_key: None,
                keywords: keywords.iter().map(|s| s.to_string()).collect(),
                logic,
            }),
        }
    }

    #[test]
    fn test_keyword_logic_table() {
        let keywords = vec!["refund".to_string(), "order".to_string()];

        assert!(keyword_match(&keywords, ConditionLogic::And, "I want a REFUND for my order"));
        assert!(!keyword_match(&keywords, ConditionLogic::And, "refund please"));
        assert!(keyword_match(&keywords, ConditionLogic::Or, "refund please"));
        assert!(!keyword_match(&keywords, ConditionLogic::Or, "hello there"));
        assert!(keyword_match(&keywords, ConditionLogic::Not, "hello there"));
        assert!(!keyword_match(&keywords, ConditionLogic::Not, "about my order"));
    }

    #[test]
    fn test_edge_without_condition_always_accepts() {
        let edge = Edge {
            id: "e1".to_string(),
            from: "a".to_string(),
            to: "b".to_string(),
            label: None,
            condition: None,
        };
        assert!(edge_accepts(&edge, ""));
        assert!(edge_accepts(&edge, "anything"));
    }

    #[test]
    fn test_decision_edge_matches_choice_key() {
        let edge = Edge {
            id: "e1".to_string(),
            from: "a".to_string(),
            to: "b".to_string(),
            label: None,
            condition: Some(EdgeCondition {
                kind: ConditionKind::Decision,
                choice_key: Some("escalate".to_string()),
                keywords: Vec::new(),
                logic: ConditionLogic::And,
            }),
        };
        assert!(edge_accepts(&edge, " escalate "));
        assert!(!edge_accepts(&edge, "resolve"));
    }

    #[test]
    fn test_pick_edge_prefers_conditional_match() {
        let fallback = Edge {
            id: "e0".to_string(),
            from: "a".to_string(),
            to: "default".to_string(),
            label: None,
            condition: None,
        };
        let conditional = question_edge(&["yes"], ConditionLogic::Or);
        let edges = vec![(&fallback, "default"), (&conditional, "matched")];

        let picked = pick_edge(&edges, "yes please").unwrap();
        assert_eq!(picked.1, "matched");

        let picked = pick_edge(&edges, "nope").unwrap();
        assert_eq!(picked.1, "default");
    }

    #[test]
    fn test_pick_edge_none_when_nothing_matches() {
        let conditional = question_edge(&["yes"], ConditionLogic::Or);
        let edges = vec![(&conditional, ())];
        assert!(pick_edge(&edges, "nope").is_none());
    }

    #[test]
    fn test_check_answer_rules() {
        let validation = AnswerValidation {
            required: true,
            min_length: Some(5),
            max_length: Some(20),
            pattern: Some(r"^\d+$".to_string()),
        };

        assert!(check_answer(&validation, "   ").is_some());
        assert!(check_answer(&validation, "123").is_some());
        assert!(check_answer(&validation, "abcdef").is_some());
        assert!(check_answer(&validation, "123456").is_none());
    }

    #[test]
    fn test_check_answer_invalid_pattern_is_ignored() {
        let validation = AnswerValidation {
            required: false,
            min_length: None,
            max_length: None,
            pattern: Some("[unclosed".to_string()),
        };
        assert!(check_answer(&validation, "anything").is_none());
    }
}
