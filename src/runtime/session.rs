//! A live training session walking a published flow.
//!
//! The session is synchronous, request-scoped state: each `advance` call
//! runs to completion over the in-memory graph, emitting events and
//! transcript logs on the channel as it goes. Text and media nodes are
//! presented and passed through automatically; interactive nodes pause the
//! walk until the learner answers.

use std::sync::{
    Arc, RwLock,
    atomic::{AtomicUsize, Ordering},
};

use tracing::debug;

use crate::{
    Result, TrainflowError,
    common::Vars,
    events::{Event, GraphEvent, Message, SessionAbortedEvent, SessionEvent, SessionFailedEvent, SessionStartEvent},
    flow::{FlowGraph, Node, NodeContent, NodeId, NodeKind, condition},
    model::FlowSettings,
    runtime::{Channel, Context},
    utils,
};

pub type SessionId = String;

/// What a visited node shows the learner.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePrompt {
    pub node_id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub message: Option<String>,
    pub choices: Vec<String>,
}

impl NodePrompt {
    fn from_node(node: &Node) -> Self {
        Self {
            node_id: node.id.clone(),
            kind: node.kind,
            label: node.label.clone(),
            message: node.content.message().map(|m| m.to_string()),
            choices: node.content.choices().to_vec(),
        }
    }
}

/// Result of one start/advance call: everything presented since the last
/// learner input, and what the session is waiting for now.
#[derive(Debug, Clone, Default)]
pub struct Turn {
    /// Content nodes presented this turn, in walk order.
    pub messages: Vec<NodePrompt>,
    /// Interactive node now awaiting input; `None` once completed.
    pub awaiting: Option<NodePrompt>,
    /// Learner-facing reason the last answer was not accepted; the session
    /// stays on the same node.
    pub rejected: Option<String>,
    pub completed: bool,
}

/// A running conversation over one published flow.
pub struct Session {
    id: SessionId,
    fid: String,
    graph: Arc<FlowGraph>,
    ctx: Context,
    current: RwLock<Option<NodeId>>,
    steps: AtomicUsize,
    /// Whole-traversal step budget: `maxDepth × node count`.
    max_steps: usize,
}

impl Session {
    pub(crate) fn new(
        fid: &str,
        graph: FlowGraph,
        settings: &FlowSettings,
        channel: Arc<Channel>,
    ) -> Result<Arc<Self>> {
        if graph.start_node().is_none() {
            return Err(TrainflowError::Session(format!("flow {} has no start node", fid)));
        }

        let sid = utils::longid();
        let max_steps = settings.max_depth.max(1) * graph.node_count().max(1);

        Ok(Arc::new(Self {
            id: sid.clone(),
            fid: fid.to_string(),
            graph: Arc::new(graph),
            ctx: Context::new(sid, channel),
            current: RwLock::new(None),
            steps: AtomicUsize::new(0),
            max_steps,
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fid(&self) -> &str {
        &self.fid
    }

    /// Enter the flow at its start node and walk to the first stop point.
    pub fn start(&self) -> Result<Turn> {
        let start_id = self.graph.start_node().map(|node| node.id.clone()).expect("checked at construction");

        self.emit(
            "",
            GraphEvent::Session(SessionEvent::Started(SessionStartEvent {
                node_ids: self.graph.node_ids(),
            })),
        );
        debug!("session {} started on flow {}", self.id, self.fid);

        let mut turn = Turn::default();
        self.walk_from(start_id, &mut turn)?;
        Ok(turn)
    }

    /// Feed a learner answer to the awaiting interactive node and walk on.
    pub fn advance(
        &self,
        input: &str,
    ) -> Result<Turn> {
        if self.ctx.is_done() {
            return Err(TrainflowError::Session(format!("session {} is no longer active", self.id)));
        }
        let current_id = self
            .current
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| TrainflowError::Session(format!("session {} has not been started", self.id)))?;
        let node = self.graph.node(&current_id).ok_or_else(|| TrainflowError::Session(format!("node {} not found", current_id)))?;

        if !node.kind.is_interactive() {
            return Err(TrainflowError::Session(format!("node \"{}\" does not take learner input", current_id)));
        }

        // Assessment answers must pass their constraints before the flow
        // moves on; a rejection keeps the session on the same node.
        if let NodeContent::Assessment(content) = &node.content {
            if let Some(reason) = condition::check_answer(&content.validation, input) {
                return Ok(Turn {
                    awaiting: Some(NodePrompt::from_node(node)),
                    rejected: Some(reason),
                    ..Default::default()
                });
            }
        }

        let outgoing = self.graph.outgoing(&current_id);
        if outgoing.is_empty() {
            return self.fail(&current_id, format!("node \"{}\" has no outgoing transitions", current_id));
        }

        let Some((_, target)) = condition::pick_edge(&outgoing, input) else {
            return Ok(Turn {
                awaiting: Some(NodePrompt::from_node(node)),
                rejected: Some("Answer did not match any available path".to_string()),
                ..Default::default()
            });
        };

        self.ctx.add_answer(current_id.clone(), Vars::new().with("answer", input));
        self.ctx.emit_log(current_id.clone(), format!("learner: {}", input));

        let next_id = target.id.clone();
        let mut turn = Turn::default();
        self.walk_from(next_id, &mut turn)?;
        Ok(turn)
    }

    /// Abort the session; no further input is accepted.
    pub fn abort(
        &self,
        reason: &str,
    ) {
        self.emit(
            "",
            GraphEvent::Session(SessionEvent::Aborted(SessionAbortedEvent {
                reason: reason.to_string(),
            })),
        );
        self.ctx.done();
    }

    pub fn is_complete(&self) -> bool {
        self.ctx.is_done()
    }

    /// Answers collected so far, keyed by node id.
    pub fn answers(&self) -> Vars {
        let mut result = Vars::new();
        for (nid, answer) in self.ctx.answers().iter() {
            result.set(nid.as_str(), answer.clone());
        }
        result
    }

    /// Present nodes from `from` onward, following unconditional edges,
    /// until an interactive node or the end marker stops the walk.
    fn walk_from(
        &self,
        from: NodeId,
        turn: &mut Turn,
    ) -> Result<()> {
        let mut current = from;

        loop {
            let steps = self.steps.fetch_add(1, Ordering::Relaxed) + 1;
            if steps > self.max_steps {
                return self.fail(&current, format!("exceeded the maximum of {} steps", self.max_steps));
            }

            let node = self.graph.node(&current).ok_or_else(|| TrainflowError::Session(format!("node {} not found", current)))?;
            *self.current.write().unwrap() = Some(current.clone());
            self.emit(&current, GraphEvent::Session(SessionEvent::Presented(utils::time::time_millis())));

            if let Some(message) = node.content.message() {
                self.ctx.emit_log(current.clone(), format!("bot: {}", message));
            }

            if node.kind == NodeKind::End {
                turn.completed = true;
                self.emit("", GraphEvent::Session(SessionEvent::Completed));
                self.ctx.done();
                return Ok(());
            }

            if node.kind.is_interactive() {
                turn.awaiting = Some(NodePrompt::from_node(node));
                return Ok(());
            }

            if !node.kind.is_marker() {
                turn.messages.push(NodePrompt::from_node(node));
            }

            let outgoing = self.graph.outgoing(&current);
            let next = outgoing.iter().find(|(edge, _)| edge.is_unconditional());
            match next {
                Some((_, target)) => current = target.id.clone(),
                None => {
                    return self.fail(&current, format!("node \"{}\" has no outgoing transitions", current));
                }
            }
        }
    }

    fn fail<T>(
        &self,
        nid: &str,
        error: String,
    ) -> Result<T> {
        self.emit(
            nid,
            GraphEvent::Session(SessionEvent::Failed(SessionFailedEvent {
                error: error.clone(),
            })),
        );
        self.ctx.done();
        Err(TrainflowError::Session(error))
    }

    fn emit(
        &self,
        nid: &str,
        event: GraphEvent,
    ) {
        let _ = self.ctx.channel().event_queue().send(Event::new(&Message {
            sid: self.id.clone(),
            nid: nid.to_string(),
            event,
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::model::FlowModel;
    use crate::runtime::Channel;

    fn create_test_channel() -> Arc<Channel> {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        Arc::new(Channel::new(Arc::new(runtime)))
    }

    fn session_for(value: serde_json::Value) -> Arc<Session> {
        let model: FlowModel = serde_json::from_value(value).unwrap();
        let graph = FlowGraph::from_model(&model).unwrap();
        Session::new("f1", graph, &model.settings, create_test_channel()).unwrap()
    }

    #[test]
    fn test_walk_linear_flow() {
        let session = session_for(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "text", "data": {"message": "welcome"}},
                {"id": "n3", "type": "text", "data": {"message": "first lesson"}},
                {"id": "n4", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2"},
                {"id": "e2", "from": "n2", "to": "n3"},
                {"id": "e3", "from": "n3", "to": "n4"}
            ]
        }));

        let turn = session.start().unwrap();

        assert!(turn.completed);
        assert!(turn.awaiting.is_none());
        let texts: Vec<&str> = turn.messages.iter().filter_map(|p| p.message.as_deref()).collect();
        assert_eq!(texts, ["welcome", "first lesson"]);
        assert!(session.is_complete());
    }

    #[test]
    fn test_question_pauses_then_branches() {
        let session = session_for(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "q", "type": "question", "data": {"message": "need a refund?", "choices": ["yes", "no"], "keywords": []}},
                {"id": "yes", "type": "text", "data": {"message": "refund path"}},
                {"id": "no", "type": "text", "data": {"message": "other path"}},
                {"id": "z", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "q"},
                {"id": "e2", "from": "q", "to": "yes",
                 "condition": {"type": "question", "keywords": ["refund", "yes"], "logic": "or"}},
                {"id": "e3", "from": "q", "to": "no"},
                {"id": "e4", "from": "yes", "to": "z"},
                {"id": "e5", "from": "no", "to": "z"}
            ]
        }));

        let turn = session.start().unwrap();
        let awaiting = turn.awaiting.unwrap();
        assert_eq!(awaiting.node_id, "q");
        assert_eq!(awaiting.choices, ["yes", "no"]);
        assert!(!turn.completed);

        let turn = session.advance("yes, a refund please").unwrap();
        assert!(turn.completed);
        assert_eq!(turn.messages[0].message.as_deref(), Some("refund path"));
    }

    #[test]
    fn test_unmatched_answer_takes_fallback_edge() {
        let session = session_for(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "q", "type": "question", "data": {"message": "?", "choices": [], "keywords": []}},
                {"id": "kw", "type": "text", "data": {"message": "keyword path"}},
                {"id": "other", "type": "text", "data": {"message": "fallback path"}},
                {"id": "z", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "q"},
                {"id": "e2", "from": "q", "to": "kw",
                 "condition": {"type": "question", "keywords": ["billing"], "logic": "and"}},
                {"id": "e3", "from": "q", "to": "other"},
                {"id": "e4", "from": "kw", "to": "z"},
                {"id": "e5", "from": "other", "to": "z"}
            ]
        }));

        session.start().unwrap();
        let turn = session.advance("something unrelated").unwrap();

        assert!(turn.completed);
        assert_eq!(turn.messages[0].message.as_deref(), Some("fallback path"));
    }

    #[test]
    fn test_assessment_rejects_short_answer() {
        let session = session_for(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "a", "type": "assessment",
                 "data": {"message": "summarize the policy", "validation": {"required": true, "minLength": 10}}},
                {"id": "z", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "a"},
                {"id": "e2", "from": "a", "to": "z"}
            ]
        }));

        session.start().unwrap();

        let turn = session.advance("short").unwrap();
        assert!(turn.rejected.is_some());
        assert_eq!(turn.awaiting.unwrap().node_id, "a");
        assert!(!session.is_complete());

        let turn = session.advance("a sufficiently long answer").unwrap();
        assert!(turn.completed);
    }

    #[test]
    fn test_advance_before_start_fails() {
        let session = session_for(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "n2", "type": "end"}
            ],
            "edges": [{"id": "e1", "from": "n1", "to": "n2"}]
        }));

        assert!(session.advance("hello").is_err());
    }

    #[test]
    fn test_loop_flow_hits_step_cap() {
        let session = session_for(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "a", "type": "text", "data": {"message": "a"}},
                {"id": "b", "type": "text", "data": {"message": "b"}},
                {"id": "z", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "a"},
                {"id": "e2", "from": "a", "to": "b"},
                {"id": "e3", "from": "b", "to": "a"}
            ],
            "settings": {"allowLoops": true, "maxDepth": 3}
        }));

        let err = session.start().unwrap_err();
        assert!(err.to_string().contains("maximum"));
        assert!(session.is_complete());
    }

    #[test]
    fn test_answers_are_recorded() {
        let session = session_for(json!({
            "nodes": [
                {"id": "n1", "type": "start"},
                {"id": "q", "type": "question", "data": {"message": "?", "choices": ["ok"], "keywords": []}},
                {"id": "z", "type": "end"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "q"},
                {"id": "e2", "from": "q", "to": "z"}
            ]
        }));

        session.start().unwrap();
        session.advance("ok").unwrap();

        let answers = session.answers();
        let recorded: Vars = answers.get("q").unwrap();
        assert_eq!(recorded.get::<String>("answer").unwrap(), "ok");
    }
}
