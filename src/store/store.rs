use std::{
    any::Any,
    collections::HashMap,
    convert::AsRef,
    sync::{Arc, RwLock},
};

use tracing::trace;

use crate::{
    Result, ShareLock, TrainflowError,
    flow::{ValidationPolicy, validate_flow},
    model::FlowModel,
    utils,
};

use super::{DbCollection, DbCollectionIden, StoreIden, data::*, query::{Cond, Query}};

#[derive(Clone)]
pub struct DynDbSetRef<T>(Arc<dyn DbCollection<Item = T>>);

/// Type-indexed registry of collections plus the flow lifecycle operations
/// built on top of them.
pub struct Store {
    collections: ShareLock<HashMap<StoreIden, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn collection<DATA>(&self) -> Arc<dyn DbCollection<Item = DATA>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collections = self.collections.read().unwrap();

        #[allow(clippy::expect_fun_call)]
        let collection = collections.get(&DATA::iden()).expect(&format!("fail to get collection: {}", DATA::iden().as_ref()));

        #[allow(clippy::expect_fun_call)]
        collection.downcast_ref::<DynDbSetRef<DATA>>().map(|v| v.0.clone()).expect(&format!("fail to get collection: {}", DATA::iden().as_ref()))
    }

    pub fn register<DATA>(
        &self,
        collection: Arc<dyn DbCollection<Item = DATA> + Send + Sync + 'static>,
    ) where
        DATA: DbCollectionIden + 'static,
    {
        let mut collections = self.collections.write().unwrap();
        collections.insert(DATA::iden(), Arc::new(DynDbSetRef::<DATA>(collection)));
    }

    pub fn flows(&self) -> Arc<dyn DbCollection<Item = Flow>> {
        self.collection()
    }

    pub fn sessions(&self) -> Arc<dyn DbCollection<Item = Session>> {
        self.collection()
    }

    pub fn events(&self) -> Arc<dyn DbCollection<Item = Event>> {
        self.collection()
    }

    pub fn logs(&self) -> Arc<dyn DbCollection<Item = Log>> {
        self.collection()
    }

    /// Store a draft flow definition, recomputing its derived metadata.
    ///
    /// Published versions are immutable: editing one requires unpublishing
    /// it first.
    pub fn deploy(
        &self,
        flow: &FlowModel,
    ) -> Result<bool> {
        trace!("store::deploy({})", flow.id);
        if flow.id.is_empty() {
            return Err(TrainflowError::Flow("missing id in flow".into()));
        }

        let mut flow = flow.clone();
        flow.is_published = false;
        flow.normalize();

        let flows = self.flows();
        match flows.find(&flow.id) {
            Ok(m) => {
                if m.is_published {
                    return Err(TrainflowError::Flow(format!("flow {} is published and cannot be modified; unpublish it first", flow.id)));
                }
                let text = flow.to_json()?;
                let data = Flow {
                    id: flow.id.clone(),
                    trainer_id: flow.trainer_id.clone(),
                    version: flow.version.clone(),
                    name: flow.name.clone(),
                    data: text,
                    is_published: false,
                    published_at: None,
                    published_by: None,
                    revision: m.revision + 1,
                    create_time: m.create_time,
                    update_time: utils::time::time_millis(),
                };
                flows.update_checked(&data, m.revision)
            }
            Err(_) => {
                let text = flow.to_json()?;
                let data = Flow {
                    id: flow.id.clone(),
                    trainer_id: flow.trainer_id.clone(),
                    version: flow.version.clone(),
                    name: flow.name.clone(),
                    data: text,
                    is_published: false,
                    published_at: None,
                    published_by: None,
                    revision: 0,
                    create_time: utils::time::time_millis(),
                    update_time: 0,
                };
                flows.create(&data)
            }
        }
    }

    /// The publish gate: validate, then flip the record to published with a
    /// revision-checked write.
    ///
    /// Any validation error blocks the transition and is surfaced as one
    /// aggregate message; warnings and suggestions never do. On success the
    /// trainer's previously published versions are demoted, keeping exactly
    /// one latest-published version per trainer.
    pub fn publish(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Flow> {
        trace!("store::publish({}, by {})", id, user_id);
        let flows = self.flows();
        let mut doc = flows.find(id)?;
        let model = FlowModel::from_json(&doc.data)?;

        let report = validate_flow(&model.nodes, &model.edges, &model.settings, &ValidationPolicy::strict());
        if !report.is_valid {
            return Err(TrainflowError::Publish(format!("Cannot publish flow: {}", report.errors.join(", "))));
        }

        let expected = doc.revision;
        doc.is_published = true;
        doc.published_at = Some(utils::time::time_millis());
        doc.published_by = Some(user_id.to_string());
        doc.revision += 1;
        doc.update_time = utils::time::time_millis();

        if !flows.update_checked(&doc, expected)? {
            return Err(TrainflowError::Store(format!("flow {} was modified concurrently; publish aborted", id)));
        }

        self.demote_published_siblings(&doc)?;

        Ok(doc)
    }

    /// Revert the published flag. No validation runs; the version itself is
    /// kept.
    pub fn unpublish(
        &self,
        id: &str,
    ) -> Result<Flow> {
        trace!("store::unpublish({})", id);
        let flows = self.flows();
        let mut doc = flows.find(id)?;

        doc.is_published = false;
        doc.published_at = None;
        doc.published_by = None;
        doc.revision += 1;
        doc.update_time = utils::time::time_millis();

        flows.update(&doc)?;
        Ok(doc)
    }

    /// Remove every flow version owned by a trainer. Called by the owning
    /// service when the trainer record itself is deleted.
    pub fn delete_trainer_flows(
        &self,
        trainer_id: &str,
    ) -> Result<usize> {
        let flows = self.flows();
        let page = flows.query(&Query::new().push(Cond::eq("trainer_id", trainer_id)).set_limit(10_000))?;

        let mut deleted = 0;
        for row in page.rows {
            if flows.delete(&row.id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Clear the published flag on the trainer's other flow versions.
    fn demote_published_siblings(
        &self,
        published: &Flow,
    ) -> Result<()> {
        let flows = self.flows();
        let page = flows.query(
            &Query::new()
                .push(Cond::eq("trainer_id", published.trainer_id.as_str()))
                .push(Cond::eq("is_published", true))
                .push(Cond::ne("id", published.id.as_str())),
        )?;

        for mut row in page.rows {
            row.is_published = false;
            row.published_at = None;
            row.published_by = None;
            row.revision += 1;
            row.update_time = utils::time::time_millis();
            flows.update(&row)?;
        }
        Ok(())
    }
}
