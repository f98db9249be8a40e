//! Filterable, pageable query description shared by all backends.

use serde_json::Value as JsonValue;

const DEFAULT_LIMIT: usize = 100;

/// A single filter condition on a record column.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    Eq(String, JsonValue),
    Ne(String, JsonValue),
}

impl Cond {
    pub fn eq<V: Into<JsonValue>>(
        key: &str,
        value: V,
    ) -> Self {
        Cond::Eq(key.to_string(), value.into())
    }

    pub fn ne<V: Into<JsonValue>>(
        key: &str,
        value: V,
    ) -> Self {
        Cond::Ne(key.to_string(), value.into())
    }

    pub fn key(&self) -> &str {
        match self {
            Cond::Eq(k, _) | Cond::Ne(k, _) => k,
        }
    }
}

/// Query description: conjunction of conditions plus paging and ordering.
#[derive(Debug, Clone)]
pub struct Query {
    conds: Vec<Cond>,
    limit: usize,
    offset: usize,
    order_by: Vec<(String, bool)>,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self {
            conds: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            order_by: Vec::new(),
        }
    }

    pub fn push(
        mut self,
        cond: Cond,
    ) -> Self {
        self.conds.push(cond);
        self
    }

    pub fn set_limit(
        mut self,
        limit: usize,
    ) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn set_offset(
        mut self,
        offset: usize,
    ) -> Self {
        self.offset = offset;
        self
    }

    /// Order by `key`; `rev` selects descending order.
    pub fn set_order(
        mut self,
        key: &str,
        rev: bool,
    ) -> Self {
        self.order_by.push((key.to_string(), rev));
        self
    }

    pub fn conds(&self) -> &[Cond] {
        &self.conds
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn order_by(&self) -> &[(String, bool)] {
        &self.order_by
    }
}
