//! Record store collaborator - the hosted database the storefront reads and writes
//!
//! Services only see the [`RecordStore`] trait. [`RestStore`] talks to a
//! PostgREST-style HTTP backend, [`MemoryStore`] keeps rows in process.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub use memory::{CounterRpc, MemoryStore, StoreOp};
pub use rest::RestStore;

/// Comparison applied to a single column
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    Lte(String, String),
}

impl Filter {
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Filter::Eq(column.to_string(), value.to_string())
    }

    pub fn lte(column: &str, value: impl ToString) -> Self {
        Filter::Lte(column.to_string(), value.to_string())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::Lte(c, _) => c,
        }
    }

    fn operator(&self) -> &'static str {
        match self {
            Filter::Eq(..) => "eq",
            Filter::Lte(..) => "lte",
        }
    }

    fn value(&self) -> &str {
        match self {
            Filter::Eq(_, v) | Filter::Lte(_, v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }

    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: true,
        }
    }
}

/// Row selection: filters are ANDed, orders apply left to right
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query string (`select=*&col=eq.v&order=a.desc,b.asc&limit=1`)
    pub fn to_query_string(&self) -> String {
        let mut parts = vec!["select=*".to_string()];

        for filter in &self.filters {
            parts.push(filter_param(filter));
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            parts.push(format!("order={}", order));
        }

        if let Some(limit) = self.limit {
            parts.push(format!("limit={}", limit));
        }

        parts.join("&")
    }
}

pub(crate) fn filter_param(filter: &Filter) -> String {
    format!(
        "{}={}.{}",
        urlencoding::encode(filter.column()),
        filter.operator(),
        urlencoding::encode(filter.value())
    )
}

/// What to do when an upserted row collides on its conflict key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Merge the supplied columns into the existing row
    Merge,
    /// Keep the existing row untouched
    Ignore,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Insert or merge `record`, keyed on `conflict_key`.
    /// Returns the stored row, or `None` when an `Ignore` upsert left an existing row alone.
    async fn upsert(
        &self,
        table: &str,
        record: Value,
        conflict_key: &str,
        on_conflict: OnConflict,
    ) -> Result<Option<Value>, StoreError>;

    /// Merge `fields` into every row matching `filter`; returns the rows as stored afterwards
    async fn update(&self, table: &str, fields: Value, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Server-side function call. Backends without one report `Unsupported`.
    async fn rpc(&self, name: &str, _args: Value) -> Result<Value, StoreError> {
        Err(StoreError::Unsupported(name.to_string()))
    }

    async fn get(&self, table: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let query = Query::new().filter(filter.clone()).limit(1);
        Ok(self.select(table, &query).await?.into_iter().next())
    }
}
