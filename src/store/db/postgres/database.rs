use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::store::{DbCollection, DbStore, Store, data::*};

use super::{DbInit, collection::*, synclient::SynClient};

/// PostgreSQL storage backend.
pub struct PostgresStore {
    flows: Arc<FlowCollection>,
    sessions: Arc<SessionCollection>,
    events: Arc<EventCollection>,
    logs: Arc<LogCollection>,
}

impl DbStore for PostgresStore {
    fn init(
        &self,
        s: &Store,
    ) {
        self.flows.init();
        self.sessions.init();
        self.events.init();
        self.logs.init();

        s.register(self.flows());
        s.register(self.sessions());
        s.register(self.events());
        s.register(self.logs());
    }
}

impl PostgresStore {
    pub fn new(
        db_url: &str,
        runtime: Arc<Runtime>,
    ) -> Self {
        let conn = Arc::new(SynClient::connect(db_url, runtime));
        let flows = FlowCollection::new(&conn);
        let sessions = SessionCollection::new(&conn);
        let events = EventCollection::new(&conn);
        let logs = LogCollection::new(&conn);

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
