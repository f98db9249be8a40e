use std::sync::Arc;

use crate::{
    common::{MemCache, Shutdown, Vars},
    events::{Event, Log},
    flow::NodeId,
    runtime::{Channel, SessionId},
    utils,
};

/// Per-session execution context: learner answers and the event channel.
#[derive(Clone)]
pub struct Context {
    sid: SessionId,
    answers: Arc<MemCache<NodeId, Vars>>,
    channel: Arc<Channel>,

    shutdown: Arc<Shutdown>,
}

impl Context {
    pub fn new(
        sid: SessionId,
        channel: Arc<Channel>,
    ) -> Self {
        Self {
            sid,
            answers: Arc::new(MemCache::new(1024)),
            channel,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    pub fn answers(&self) -> Arc<MemCache<NodeId, Vars>> {
        self.answers.clone()
    }

    pub fn add_answer(
        &self,
        nid: NodeId,
        answer: Vars,
    ) {
        self.answers.set(nid, answer);
    }

    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    pub fn emit_log(
        &self,
        nid: NodeId,
        content: String,
    ) {
        let log = Log {
            sid: self.sid.clone(),
            nid,
            content,
            timestamp: utils::time::time_millis(),
        };
        let _ = self.channel.log_queue().send(Event::new(&log));
    }

    pub fn sid(&self) -> SessionId {
        self.sid.to_owned()
    }

    pub fn done(&self) {
        self.shutdown.shutdown();
    }

    pub fn is_done(&self) -> bool {
        self.shutdown.is_terminated()
    }
}
