//! Generic in-memory collection backing [`super::MemStore`].

use std::{cmp::Ordering, collections::HashMap, sync::RwLock};

use serde_json::Value as JsonValue;

use crate::{
    Result, TrainflowError,
    store::{
        DbCollection, PageData,
        query::{Cond, Query},
    },
};

use super::DbDocument;

/// A HashMap-backed collection with the same query surface as the SQL
/// backend, including the revision-checked update for revisioned records.
#[derive(Debug)]
pub struct Collect<T> {
    name: String,
    items: RwLock<HashMap<String, T>>,
}

impl<T> Collect<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> DbCollection for Collect<T>
where
    T: DbDocument + Clone + Send + Sync,
{
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        let items = self.items.read().unwrap();
        Ok(items.contains_key(id))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        let items = self.items.read().unwrap();
        items.get(id).cloned().ok_or(TrainflowError::Store(format!("cannot find {} {}", self.name, id)))
    }

    fn query(
        &self,
        query: &Query,
    ) -> Result<PageData<Self::Item>> {
        let items = self.items.read().unwrap();

        let mut matched: Vec<(HashMap<String, JsonValue>, T)> = Vec::new();
        for item in items.values() {
            let doc = item.doc()?;
            if query.conds().iter().all(|cond| cond_matches(cond, &doc)) {
                matched.push((doc, item.clone()));
            }
        }

        for (key, rev) in query.order_by().iter().rev() {
            matched.sort_by(|(a, _), (b, _)| {
                let ord = cmp_values(a.get(key), b.get(key));
                if *rev {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let count = matched.len();
        let rows: Vec<T> = matched.into_iter().skip(query.offset()).take(query.limit()).map(|(_, item)| item).collect();

        Ok(PageData {
            count,
            page_num: query.offset() / query.limit() + 1,
            page_count: count.div_ceil(query.limit()),
            page_size: query.limit(),
            rows,
        })
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let mut items = self.items.write().unwrap();
        if items.contains_key(data.id()) {
            return Ok(false);
        }
        items.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let mut items = self.items.write().unwrap();
        if !items.contains_key(data.id()) {
            return Ok(false);
        }
        items.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn update_checked(
        &self,
        data: &Self::Item,
        expected: i64,
    ) -> Result<bool> {
        let mut items = self.items.write().unwrap();
        let Some(stored) = items.get(data.id()) else {
            return Ok(false);
        };
        // Non-revisioned records keep the unconditional behavior.
        if let Some(revision) = stored.revision() {
            if revision != expected {
                return Ok(false);
            }
        }
        items.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        let mut items = self.items.write().unwrap();
        Ok(items.remove(id).is_some())
    }
}

fn cond_matches(
    cond: &Cond,
    doc: &HashMap<String, JsonValue>,
) -> bool {
    let actual = doc.get(cond.key());
    match cond {
        Cond::Eq(_, expected) => actual == Some(expected),
        Cond::Ne(_, expected) => actual != Some(expected),
    }
}

fn cmp_values(
    a: Option<&JsonValue>,
    b: Option<&JsonValue>,
) -> Ordering {
    match (a, b) {
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::data::Flow;

    fn flow(id: &str, trainer: &str, published: bool, revision: i64) -> Flow {
        Flow {
            id: id.to_string(),
            trainer_id: trainer.to_string(),
            version: "1.0.0".to_string(),
            name: format!("flow {}", id),
            data: "{}".to_string(),
            is_published: published,
            published_at: None,
            published_by: None,
            revision,
            create_time: 0,
            update_time: 0,
        }
    }

    #[test]
    fn test_create_find_roundtrip() {
        let collect: Collect<Flow> = Collect::new("flows");

        assert!(collect.create(&flow("f1", "t1", false, 0)).unwrap());
        assert!(!collect.create(&flow("f1", "t1", false, 0)).unwrap());
        assert!(collect.exists("f1").unwrap());
        assert_eq!(collect.find("f1").unwrap().trainer_id, "t1");
        assert!(collect.find("missing").is_err());
    }

    #[test]
    fn test_query_filters_by_condition() {
        let collect: Collect<Flow> = Collect::new("flows");
        collect.create(&flow("f1", "t1", true, 0)).unwrap();
        collect.create(&flow("f2", "t1", false, 0)).unwrap();
        collect.create(&flow("f3", "t2", true, 0)).unwrap();

        let page = collect.query(&Query::new().push(Cond::eq("trainer_id", "t1")).push(Cond::eq("is_published", true))).unwrap();

        assert_eq!(page.count, 1);
        assert_eq!(page.rows[0].id, "f1");
    }

    #[test]
    fn test_query_orders_and_pages() {
        let collect: Collect<Flow> = Collect::new("flows");
        for (id, created) in [("f1", 3), ("f2", 1), ("f3", 2)] {
            let mut f = flow(id, "t1", false, 0);
            f.create_time = created;
            collect.create(&f).unwrap();
        }

        let page = collect.query(&Query::new().set_order("create_time", false).set_limit(2)).unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.page_count, 2);
        let ids: Vec<&str> = page.rows.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["f2", "f3"]);
    }

    #[test]
    fn test_update_checked_rejects_stale_revision() {
        let collect: Collect<Flow> = Collect::new("flows");
        collect.create(&flow("f1", "t1", false, 3)).unwrap();

        let mut fresh = flow("f1", "t1", true, 4);
        assert!(collect.update_checked(&fresh, 3).unwrap());

        // A second writer loaded revision 3 as well; its write must lose.
        fresh.revision = 4;
        assert!(!collect.update_checked(&fresh, 3).unwrap());
        assert_eq!(collect.find("f1").unwrap().revision, 4);
    }

    #[test]
    fn test_doc_projection_contains_columns() {
        let doc = flow("f1", "t1", true, 2).doc().unwrap();
        assert_eq!(doc["trainer_id"], json!("t1"));
        assert_eq!(doc["is_published"], json!(true));
        assert_eq!(doc["revision"], json!(2));
    }
}
