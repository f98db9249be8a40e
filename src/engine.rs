//! Flow engine - the main entry point for Trainflow.
//!
//! The engine manages the lifecycle of training flows and sessions:
//! - Deploying and validating flow definitions
//! - Gating the publish transition behind the validator
//! - Creating and driving live training sessions
//! - Managing the event channel and storage

mod monitor;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::runtime::{Builder, Runtime};

use crate::{
    Config, Result, StoreType, TrainflowError,
    common::{MemCache, Queue, Shutdown},
    events::{Event, FlowEvent, FlowPublishedEvent, GraphEvent, Message},
    flow::{FlowGraph, FlowStats, ValidationPolicy, ValidationReport, flow_stats, validate_flow},
    model::FlowModel,
    runtime::{Channel, ChannelEvent, ChannelOptions, Session, SessionId, Turn},
    store::{DbStore, MemStore, PostgresStore, Store, data},
    utils,
};

use monitor::Monitor;

/// Maximum number of live sessions to cache in memory.
const SESSION_CACHE_SIZE: usize = 2048;
/// Size of the queue for completed session notifications.
const SESSION_COMPLETE_QUEUE_SIZE: usize = 100;

/// The main flow engine.
///
/// Engine is the central coordinator for Trainflow, responsible for:
/// - Storing flow definitions and gating their publication
/// - Serving published flows as live training sessions
/// - Broadcasting lifecycle events on the channel
/// - Persisting events and transcripts through the monitor
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().build()?;
/// engine.launch();
///
/// engine.deploy(&flow)?;
/// engine.publish(&flow.id, "trainer-1")?;
///
/// let session = engine.build_session(&flow.id)?;
/// let turn = engine.run_session(&session)?;
/// ```
pub struct Engine {
    /// Event channel for broadcasting flow and session events.
    channel: Arc<Channel>,
    /// Persistent storage for flows, sessions, events, and transcripts.
    store: Arc<Store>,
    /// Background monitor for event persistence.
    monitor: Monitor,
    /// Queue for receiving session completion notifications.
    sessions_complete_queue: Arc<Queue<SessionId>>,
    /// In-memory cache of live sessions.
    sessions: Arc<MemCache<SessionId, Arc<Session>>>,

    /// Flag indicating if the engine is running.
    running: Arc<AtomicBool>,
    /// Tokio runtime for background task execution.
    runtime: Arc<Runtime>,
    /// Shutdown coordinator for graceful termination.
    shutdown: Arc<Shutdown>,
}

impl Engine {
    /// Creates a new engine with the given configuration.
    pub fn new_with_config(config: Config) -> Self {
        let runtime =
            Arc::new(Builder::new_multi_thread().worker_threads(config.async_worker_thread_number.into()).enable_all().build().unwrap());
        Self::new_with_runtime(config, runtime)
    }

    pub(crate) fn new_with_runtime(
        config: Config,
        runtime: Arc<Runtime>,
    ) -> Self {
        let store = Store::new();
        let db: Box<dyn DbStore> = match config.store.store_type {
            StoreType::Mem => Box::new(MemStore::new()),
            StoreType::Postgres => {
                let postgres = PostgresStore::new(
                    &config.store.postgres.expect("Postgres configuration is required when store type is Postgres").database_url,
                    runtime.clone(),
                );
                Box::new(postgres)
            }
        };
        db.init(&store);

        let store = Arc::new(store);
        let channel = Arc::new(Channel::new(runtime.clone()));
        let monitor = Monitor::new(store.clone(), channel.clone(), runtime.clone());

        let sessions_complete_queue = Queue::new(SESSION_COMPLETE_QUEUE_SIZE);

        Self {
            channel,
            store,
            monitor,
            sessions_complete_queue,
            sessions: Arc::new(MemCache::new(SESSION_CACHE_SIZE)),
            running: Arc::new(AtomicBool::new(false)),
            runtime,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Starts the engine and begins processing events.
    ///
    /// This method:
    /// - Starts the event monitor for persistence
    /// - Begins listening on the event channel
    /// - Spawns a background task to evict completed sessions
    pub fn launch(&self) {
        if self.running.swap(true, Ordering::Relaxed) {
            return;
        }

        // Register handlers first, then start listening
        // This ensures no events are missed
        self.monitor.monitor();
        self.channel.listen();

        let sessions_complete_queue = self.sessions_complete_queue.clone();
        ChannelEvent::channel(self.channel.clone(), ChannelOptions::default()).on_complete(move |sid| {
            let _ = sessions_complete_queue.send(sid);
        });

        let sessions_complete_queue = self.sessions_complete_queue.clone();
        let shutdown = self.shutdown.clone();
        let sessions = self.sessions.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Some(sid) = sessions_complete_queue.next_async() => {
                        sessions.remove(&sid);
                    }
                }
            }
        });
    }

    /// Gracefully shuts down the engine.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        self.shutdown.shutdown();
        for (_, session) in self.sessions.iter() {
            session.abort("engine shutdown");
        }
        self.channel.shutdown();
    }

    /// Stores a flow definition as a draft, recomputing derived metadata.
    pub fn deploy(
        &self,
        flow: &FlowModel,
    ) -> Result<bool> {
        let created = self.store.deploy(flow)?;
        self.emit_flow_event(&flow.id, FlowEvent::Deployed);
        Ok(created)
    }

    /// Validates a flow with the strict publish-gate policy.
    ///
    /// Pure check; nothing is stored and nothing changes state.
    pub fn validate(
        &self,
        flow: &FlowModel,
    ) -> ValidationReport {
        validate_flow(&flow.nodes, &flow.edges, &flow.settings, &ValidationPolicy::strict())
    }

    /// Runs the publish gate on a stored flow version.
    pub fn publish(
        &self,
        flow_id: &str,
        user_id: &str,
    ) -> Result<data::Flow> {
        let doc = self.store.publish(flow_id, user_id)?;
        self.emit_flow_event(
            flow_id,
            FlowEvent::Published(FlowPublishedEvent {
                version: doc.version.clone(),
                published_by: user_id.to_string(),
            }),
        );
        Ok(doc)
    }

    /// Reverts a published version to draft. No validation runs.
    pub fn unpublish(
        &self,
        flow_id: &str,
    ) -> Result<data::Flow> {
        let doc = self.store.unpublish(flow_id)?;
        self.emit_flow_event(flow_id, FlowEvent::Unpublished);
        Ok(doc)
    }

    /// Loads a stored flow definition.
    pub fn flow(
        &self,
        flow_id: &str,
    ) -> Result<FlowModel> {
        let doc = self.store.flows().find(flow_id)?;
        FlowModel::from_json(&doc.data)
    }

    /// Aggregate structural stats of a stored flow.
    pub fn flow_stats(
        &self,
        flow_id: &str,
    ) -> Result<FlowStats> {
        let model = self.flow(flow_id)?;
        Ok(flow_stats(&model.nodes, &model.edges))
    }

    /// Build a session over a published flow.
    pub fn build_session(
        &self,
        flow_id: &str,
    ) -> Result<Arc<Session>> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(TrainflowError::Engine("Engine is not running".to_string()));
        }
        let doc = self.store.flows().find(flow_id)?;
        if !doc.is_published {
            return Err(TrainflowError::Session(format!("flow {} is not published", flow_id)));
        }

        let model = FlowModel::from_json(&doc.data)?;
        let graph = FlowGraph::from_model(&model)?;
        let session = Session::new(flow_id, graph, &model.settings, self.channel.clone())?;

        if self.sessions.get(&session.id().to_string()).is_some() {
            return Err(TrainflowError::Session(format!("Session {} already exists in cache", session.id())));
        }

        Ok(session)
    }

    /// Record and start a session, returning its first turn.
    pub fn run_session(
        &self,
        session: &Arc<Session>,
    ) -> Result<Turn> {
        let session_data = data::Session {
            id: session.id().to_string(),
            fid: session.fid().to_string(),
            state: "Pending".to_string(),
            current_nid: String::new(),
            start_time: utils::time::time_millis(),
            end_time: 0,
            err: None,
            timestamp: utils::time::time_millis(),
        };
        self.store.sessions().create(&session_data)?;

        // Cache before starting so completion eviction cannot race creation
        self.sessions.set(session.id().to_string(), session.clone());

        session.start()
    }

    /// Aborts a live session by its ID.
    pub fn stop(
        &self,
        session_id: &str,
    ) -> Result<()> {
        let key = session_id.to_string();
        if let Some(session) = self.sessions.get(&key) {
            session.abort("Aborted by command");
            Ok(())
        } else {
            Err(TrainflowError::Session(format!("Session {} not found", session_id)))
        }
    }

    /// Gets a live session by its ID from the cache.
    pub fn get_session(
        &self,
        session_id: &String,
    ) -> Option<Arc<Session>> {
        self.sessions.get(session_id)
    }

    /// Returns a reference to the event channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    fn emit_flow_event(
        &self,
        flow_id: &str,
        event: FlowEvent,
    ) {
        let _ = self.channel.event_queue().send(Event::new(&Message {
            sid: flow_id.to_string(),
            nid: String::new(),
            event: GraphEvent::Flow(event),
        }));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_engine() -> Engine {
        Engine::new_with_config(Config::default())
    }

    fn sample_flow(id: &str, trainer: &str) -> FlowModel {
        serde_json::from_value(json!({
            "id": id,
            "trainerId": trainer,
            "name": "Refund training",
            "nodes": [
                {"id": "n1", "type": "start", "label": "Begin"},
                {"id": "n2", "type": "text", "data": {"message": "Welcome to refund training"}},
                {"id": "n3", "type": "question", "data": {"message": "Ready?", "choices": ["yes", "no"], "keywords": []}},
                {"id": "n4", "type": "end", "label": "Done"}
            ],
            "edges": [
                {"id": "e1", "from": "n1", "to": "n2"},
                {"id": "e2", "from": "n2", "to": "n3"},
                {"id": "e3", "from": "n3", "to": "n4"}
            ]
        }))
        .unwrap()
    }

    fn broken_flow(id: &str) -> FlowModel {
        serde_json::from_value(json!({
            "id": id,
            "trainerId": "t1",
            "nodes": [{"id": "n1", "type": "start"}],
            "edges": []
        }))
        .unwrap()
    }

    #[test]
    fn test_deploy_recomputes_metadata() {
        let engine = test_engine();
        let mut flow = sample_flow("f1", "t1");
        flow.metadata.total_nodes = 99;

        engine.deploy(&flow).unwrap();

        let stored = engine.flow("f1").unwrap();
        assert_eq!(stored.metadata.total_nodes, 4);
        assert_eq!(stored.metadata.total_edges, 3);
        assert!(stored.metadata.estimated_duration > 0);
    }

    #[test]
    fn test_publish_happy_path() {
        let engine = test_engine();
        engine.deploy(&sample_flow("f1", "t1")).unwrap();

        let doc = engine.publish("f1", "u1").unwrap();

        assert!(doc.is_published);
        assert!(doc.published_at.is_some());
        assert_eq!(doc.published_by.as_deref(), Some("u1"));
    }

    #[test]
    fn test_publish_gate_blocks_invalid_flow() {
        let engine = test_engine();
        engine.deploy(&broken_flow("f1")).unwrap();

        let err = engine.publish("f1", "u1").unwrap_err();
        let message = err.to_string();

        assert!(message.starts_with("Cannot publish flow:"));
        assert!(message.contains("no outgoing connections"));
        assert!(message.contains("at least one end node"));
    }

    #[test]
    fn test_publish_demotes_previous_version() {
        let engine = test_engine();
        let mut v1 = sample_flow("f1", "t1");
        v1.version = "1.0.0".to_string();
        let mut v2 = sample_flow("f2", "t1");
        v2.version = "1.1.0".to_string();
        engine.deploy(&v1).unwrap();
        engine.deploy(&v2).unwrap();

        engine.publish("f1", "u1").unwrap();
        engine.publish("f2", "u1").unwrap();

        assert!(!engine.store.flows().find("f1").unwrap().is_published);
        assert!(engine.store.flows().find("f2").unwrap().is_published);
    }

    #[test]
    fn test_unpublish_reverts_flags() {
        let engine = test_engine();
        engine.deploy(&sample_flow("f1", "t1")).unwrap();
        engine.publish("f1", "u1").unwrap();

        let doc = engine.unpublish("f1").unwrap();

        assert!(!doc.is_published);
        assert!(doc.published_at.is_none());
        assert!(doc.published_by.is_none());
    }

    #[test]
    fn test_deploy_rejects_published_flow() {
        let engine = test_engine();
        engine.deploy(&sample_flow("f1", "t1")).unwrap();
        engine.publish("f1", "u1").unwrap();

        let err = engine.deploy(&sample_flow("f1", "t1")).unwrap_err();
        assert!(err.to_string().contains("unpublish"));
    }

    #[test]
    fn test_session_requires_published_flow() {
        let engine = test_engine();
        engine.launch();
        engine.deploy(&sample_flow("f1", "t1")).unwrap();

        assert!(engine.build_session("f1").is_err());

        engine.publish("f1", "u1").unwrap();
        let session = engine.build_session("f1").unwrap();
        let turn = engine.run_session(&session).unwrap();

        assert_eq!(turn.messages[0].message.as_deref(), Some("Welcome to refund training"));
        assert_eq!(turn.awaiting.unwrap().node_id, "n3");
        engine.shutdown();
    }

    #[test]
    fn test_flow_stats_roundtrip() {
        let engine = test_engine();
        engine.deploy(&sample_flow("f1", "t1")).unwrap();

        let stats = engine.flow_stats("f1").unwrap();

        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.node_type_counts.values().sum::<usize>(), 4);
    }

    #[test]
    fn test_validate_does_not_mutate() {
        let engine = test_engine();
        let flow = broken_flow("f1");

        let report = engine.validate(&flow);

        assert!(!report.is_valid);
        // Nothing was stored by the pure check.
        assert!(engine.flow("f1").is_err());
    }
}
