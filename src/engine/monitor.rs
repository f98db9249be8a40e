use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::{
    events::{GraphEvent, SessionEvent},
    runtime::Channel,
    store::{Store, data},
    utils,
};

/// Background persistence of channel traffic: every event becomes an event
/// record, session events mirror into the session record, transcript lines
/// land in the log collection.
pub struct Monitor {
    store: Arc<Store>,
    channel: Arc<Channel>,

    runtime: Arc<Runtime>,
}

impl Monitor {
    pub fn new(
        store: Arc<Store>,
        channel: Arc<Channel>,
        runtime: Arc<Runtime>,
    ) -> Self {
        Self {
            store,
            channel,
            runtime,
        }
    }

    pub fn monitor(&self) {
        let store = self.store.clone();
        let channel = self.channel.clone();

        self.runtime.spawn(async move {
            let mut event_queue = channel.event_queue().subscribe();
            while let Ok(event_msg) = event_queue.recv().await {
                let event = &event_msg;
                // 1. Persist raw event
                let name = match &event.event {
                    GraphEvent::Flow(e) => format!("Flow:{}", e.str()),
                    GraphEvent::Session(e) => format!("Session:{}", e.str()),
                };
                let _ = store.events().create(&data::Event {
                    id: utils::shortid(),
                    sid: event.sid.clone(),
                    nid: event.nid.clone(),
                    name,
                    message: format!("{:?}", event.event),
                    timestamp: utils::time::time_millis(),
                });

                // 2. Mirror session state into the session record
                if let GraphEvent::Session(e) = &event.event {
                    if let Ok(mut session_data) = store.sessions().find(&event.sid) {
                        session_data.state = e.str().to_string();
                        session_data.timestamp = utils::time::time_millis();

                        if !event.nid.is_empty() {
                            session_data.current_nid = event.nid.clone();
                        }

                        match e {
                            SessionEvent::Completed | SessionEvent::Failed(_) | SessionEvent::Aborted(_) => {
                                session_data.end_time = utils::time::time_millis();
                            }
                            _ => {}
                        }

                        if let SessionEvent::Failed(f) = e {
                            session_data.err = Some(f.error.clone());
                        }
                        if let SessionEvent::Aborted(a) = e {
                            session_data.err = Some(a.reason.clone());
                        }

                        let _ = store.sessions().update(&session_data);
                    }
                }
            }
        });

        let store = self.store.clone();
        let channel = self.channel.clone();

        self.runtime.spawn(async move {
            let mut log_queue = channel.log_queue().subscribe();
            while let Ok(log_msg) = log_queue.recv().await {
                let log = &log_msg;
                let _ = store.logs().create(&data::Log {
                    id: utils::shortid(),
                    sid: log.sid.clone(),
                    nid: log.nid.clone(),
                    content: log.content.clone(),
                    timestamp: log.timestamp,
                });
            }
        });
    }
}
