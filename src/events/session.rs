use crate::flow::NodeId;

/// Session progress events.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started(SessionStartEvent),
    /// A node was shown to the learner.
    Presented(i64),
    Completed,
    Failed(SessionFailedEvent),
    Aborted(SessionAbortedEvent),
}

impl SessionEvent {
    pub fn str(&self) -> &str {
        match self {
            SessionEvent::Started(_) => "Running",
            SessionEvent::Presented(_) => "Running",
            SessionEvent::Completed => "Completed",
            SessionEvent::Failed(_) => "Failed",
            SessionEvent::Aborted(_) => "Aborted",
        }
    }
}

/// Event emitted when a session starts.
#[derive(Debug, Clone)]
pub struct SessionStartEvent {
    /// All node IDs in the flow, for subscribers that track coverage.
    pub node_ids: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct SessionFailedEvent {
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct SessionAbortedEvent {
    pub reason: String,
}
