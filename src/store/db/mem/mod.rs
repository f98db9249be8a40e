mod collect;

use std::{collections::HashMap, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

use crate::{
    Result,
    store::{DbCollection, DbStore, Store, data::*},
};
pub use collect::Collect;

/// In-memory storage backend for tests and embedded use.
#[derive(Debug)]
pub struct MemStore {
    flows: Arc<Collect<Flow>>,
    sessions: Arc<Collect<Session>>,
    events: Arc<Collect<Event>>,
    logs: Arc<Collect<Log>>,
}

/// Record behavior the generic in-memory collection needs: identity, an
/// indexable field map, and (for revisioned records) the CAS revision.
trait DbDocument: Serialize + DeserializeOwned {
    fn id(&self) -> &str;

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let value = serde_json::to_value(self)?;
        match value {
            JsonValue::Object(map) => Ok(map.into_iter().collect()),
            _ => Ok(HashMap::new()),
        }
    }

    fn revision(&self) -> Option<i64> {
        None
    }
}

impl DbDocument for Flow {
    fn id(&self) -> &str {
        &self.id
    }

    fn revision(&self) -> Option<i64> {
        Some(self.revision)
    }
}

impl DbDocument for Session {
    fn id(&self) -> &str {
        &self.id
    }
}

impl DbDocument for Event {
    fn id(&self) -> &str {
        &self.id
    }
}

impl DbDocument for Log {
    fn id(&self) -> &str {
        &self.id
    }
}

impl DbStore for MemStore {
    fn init(
        &self,
        s: &Store,
    ) {
        s.register(self.flows());
        s.register(self.sessions());
        s.register(self.events());
        s.register(self.logs());
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        let flows = Collect::new("flows");
        let sessions = Collect::new("sessions");
        let events = Collect::new("events");
        let logs = Collect::new("logs");

        Self {
            flows: Arc::new(flows),
            sessions: Arc::new(sessions),
            events: Arc::new(events),
            logs: Arc::new(logs),
        }
    }

    pub fn flows(&self) -> Arc<dyn DbCollection<Item = Flow> + Send + Sync> {
        self.flows.clone()
    }

    pub fn sessions(&self) -> Arc<dyn DbCollection<Item = Session> + Send + Sync> {
        self.sessions.clone()
    }

    pub fn events(&self) -> Arc<dyn DbCollection<Item = Event> + Send + Sync> {
        self.events.clone()
    }

    pub fn logs(&self) -> Arc<dyn DbCollection<Item = Log> + Send + Sync> {
        self.logs.clone()
    }
}
