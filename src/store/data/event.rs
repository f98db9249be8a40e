use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// Persisted engine event.
#[derive(Default, Deserialize, Serialize, Debug, Clone)]
pub struct Event {
    pub id: String,
    pub sid: String,
    pub nid: String,
    pub name: String,
    pub message: String,

    pub timestamp: i64,
}

impl DbCollectionIden for Event {
    fn iden() -> StoreIden {
        StoreIden::Events
    }
}
