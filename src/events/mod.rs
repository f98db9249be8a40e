//! Event types emitted by the engine.
//!
//! Events are broadcast on the channel to notify subscribers about flow
//! lifecycle changes (deploy, publish, unpublish) and session progress
//! (started, presented, completed, failed).

mod flow;
mod session;

pub use flow::*;
pub use session::*;

use crate::{flow::NodeId, runtime::SessionId};

/// Generic event wrapper.
#[derive(Debug, Clone)]
pub struct Event<T> {
    inner: T,
}

/// Top-level event type for the engine.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// Flow lifecycle events (deployed, published, unpublished).
    Flow(FlowEvent),
    /// Session progress events (started, presented, completed, etc.).
    Session(SessionEvent),
}

/// Event message containing its subject context.
#[derive(Debug, Clone)]
pub struct Message {
    /// Session ID for session events; flow ID for flow lifecycle events.
    pub sid: SessionId,
    /// Node ID the event concerns (empty for flow/session-level events).
    pub nid: NodeId,
    /// The actual event data.
    pub event: GraphEvent,
}

/// Transcript line emitted while a session runs.
#[derive(Debug, Clone)]
pub struct Log {
    /// Session ID that generated this line.
    pub sid: SessionId,
    /// Node ID the line belongs to.
    pub nid: NodeId,
    /// Line content.
    pub content: String,
    /// Timestamp in milliseconds.
    pub timestamp: i64,
}

impl<T> std::ops::Deref for Event<T>
where
    T: std::fmt::Debug + Clone,
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Event<T>
where
    T: std::fmt::Debug + Clone,
{
    pub fn new(inner: &T) -> Self {
        Self {
            inner: inner.clone(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl GraphEvent {
    pub fn is_complete(&self) -> bool {
        matches!(self, GraphEvent::Session(SessionEvent::Completed))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GraphEvent::Session(SessionEvent::Failed(_)))
    }
}
