use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// Persisted flow version.
///
/// `data` holds the full graph payload as JSON; the surrounding columns are
/// what the publish gate and version listings query on. `revision` backs the
/// compare-and-swap publish update.
#[derive(Default, Deserialize, Serialize, Debug, Clone)]
pub struct Flow {
    pub id: String,
    pub trainer_id: String,
    pub version: String,
    pub name: String,
    pub data: String,
    pub is_published: bool,
    pub published_at: Option<i64>,
    pub published_by: Option<String>,
    pub revision: i64,
    pub create_time: i64,
    pub update_time: i64,
}

impl DbCollectionIden for Flow {
    fn iden() -> StoreIden {
        StoreIden::Flows
    }
}
