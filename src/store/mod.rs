//! Storage layer for persisting flows, sessions, events, and transcripts.
//!
//! Provides an abstraction over different storage backends:
//! - `MemStore`: In-memory storage for testing
//! - `PostgresStore`: PostgreSQL for production persistence
//!
//! The flow collection additionally supports a revision-checked update
//! (`update_checked`), the optimistic-concurrency primitive the publish gate
//! relies on: of two concurrent publishes of the same flow version, at most
//! one write wins.

pub mod data;
mod db;
pub mod query;
mod store;

use std::error::Error;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

use crate::{Result, TrainflowError};

use query::*;

pub use db::{MemStore, PostgresStore};
pub use store::Store;

/// Maps database errors to TrainflowError.
fn map_db_err(err: impl Error) -> TrainflowError {
    TrainflowError::Store(err.to_string())
}

/// Identifiers for different storage collections.
#[derive(Debug, Clone, AsRefStr, PartialEq, Hash, Eq, EnumIter)]
pub enum StoreIden {
    /// Flow definitions, one record per version.
    #[strum(serialize = "flows")]
    Flows,
    /// Training session instances.
    #[strum(serialize = "sessions")]
    Sessions,
    /// Engine events.
    #[strum(serialize = "events")]
    Events,
    /// Session transcript lines.
    #[strum(serialize = "logs")]
    Logs,
}

/// Paginated query result.
#[derive(Debug, Deserialize, Serialize)]
pub struct PageData<T> {
    /// Total number of matching records.
    pub count: usize,
    /// Current page number (1-based).
    pub page_num: usize,
    /// Total number of pages.
    pub page_count: usize,
    /// Number of records per page.
    pub page_size: usize,
    /// Records in the current page.
    pub rows: Vec<T>,
}

/// Trait for types that can identify their storage collection.
pub trait DbCollectionIden {
    /// Returns the collection identifier for this type.
    fn iden() -> StoreIden;
}

/// Trait for database collection operations.
pub trait DbCollection: Send + Sync {
    /// The type of items stored in this collection.
    type Item;

    /// Checks if a record with the given ID exists.
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Finds a record by ID.
    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item>;

    /// Queries records with pagination and filtering.
    fn query(
        &self,
        query: &Query,
    ) -> Result<PageData<Self::Item>>;

    /// Creates a new record.
    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Updates an existing record.
    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Updates a record only if its stored revision matches `expected`.
    ///
    /// Collections without a revision column fall back to an unconditional
    /// update. Returns `Ok(false)` when the record changed underneath the
    /// caller, who decides whether that is a conflict.
    fn update_checked(
        &self,
        data: &Self::Item,
        expected: i64,
    ) -> Result<bool> {
        let _ = expected;
        self.update(data)
    }

    /// Deletes a record by ID.
    fn delete(
        &self,
        id: &str,
    ) -> Result<bool>;
}

/// Trait for database store initialization.
pub trait DbStore {
    /// Initializes the database and registers collections with the store.
    fn init(
        &self,
        s: &Store,
    );
}
