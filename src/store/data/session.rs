use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// Persisted training session instance.
#[derive(Default, Deserialize, Serialize, Debug, Clone)]
pub struct Session {
    pub id: String,
    pub fid: String,

    pub state: String,
    pub current_nid: String,
    pub start_time: i64,
    pub end_time: i64,
    pub err: Option<String>,
    pub timestamp: i64,
}

impl DbCollectionIden for Session {
    fn iden() -> StoreIden {
        StoreIden::Sessions
    }
}
