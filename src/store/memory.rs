//! In-process record store
//!
//! Rows live in a mutex-guarded map of JSON objects. Counter RPCs adjust a
//! column under the same lock, which gives them the atomicity a hosted
//! backend function would have. Latency, outages and per-operation
//! failures can be injected.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Filter, OnConflict, Query, RecordStore};
use crate::constants::{
    STICKERS_TABLE, STICKER_LIKES_COLUMN, TOGGLE_LIKES_FLAG_ARG, TOGGLE_LIKES_ID_ARG,
    TOGGLE_LIKES_RPC,
};
use crate::error::StoreError;
use crate::utils::error_handling::safe_lock;

/// Store calls that can be made to fail individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    Upsert,
    Update,
    Rpc,
}

/// Server-side counter function: `name(id_arg, flag_arg) -> new value of column`
#[derive(Debug, Clone)]
pub struct CounterRpc {
    pub name: String,
    pub table: String,
    pub id_arg: String,
    pub flag_arg: String,
    pub column: String,
}

impl CounterRpc {
    /// The sticker like counter function
    pub fn toggle_likes() -> Self {
        Self {
            name: TOGGLE_LIKES_RPC.to_string(),
            table: STICKERS_TABLE.to_string(),
            id_arg: TOGGLE_LIKES_ID_ARG.to_string(),
            flag_arg: TOGGLE_LIKES_FLAG_ARG.to_string(),
            column: STICKER_LIKES_COLUMN.to_string(),
        }
    }
}

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Value>>,
    next_id: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    counters: Vec<CounterRpc>,
    latency: Option<Duration>,
    offline: AtomicBool,
    failures: Mutex<HashMap<StoreOp, StoreError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counter_rpc(mut self, rpc: CounterRpc) -> Self {
        self.counters.push(rpc);
        self
    }

    /// Every call sleeps this long before touching the rows
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every later `op` call fails with `error` until [`MemoryStore::recover`]
    pub fn fail(&self, op: StoreOp, error: StoreError) {
        if let Some(mut failures) = safe_lock(&self.failures, "MemoryStore") {
            failures.insert(op, error);
        }
    }

    pub fn recover(&self, op: StoreOp) {
        if let Some(mut failures) = safe_lock(&self.failures, "MemoryStore") {
            failures.remove(&op);
        }
    }

    /// Insert a row as-is (assigns `id` when absent)
    pub fn insert(&self, table: &str, row: Value) {
        if let Some(mut tables) = safe_lock(&self.tables, "MemoryStore") {
            let row = assign_id(&mut tables, row);
            tables.rows.entry(table.to_string()).or_default().push(row);
        }
    }

    /// Snapshot of every row in `table`
    pub fn rows(&self, table: &str) -> Vec<Value> {
        safe_lock(&self.tables, "MemoryStore")
            .and_then(|tables| tables.rows.get(table).cloned())
            .unwrap_or_default()
    }

    async fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("memory store offline".to_string()));
        }
        let injected = safe_lock(&self.failures, "MemoryStore").and_then(|f| f.get(&op).cloned());
        match injected {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        safe_lock(&self.tables, "MemoryStore")
            .ok_or_else(|| StoreError::Unreachable("memory store lock unavailable".to_string()))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.enter(StoreOp::Select).await?;
        let tables = self.lock()?;

        let mut rows: Vec<Value> = tables
            .rows
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            for order in &query.order {
                let ord = compare_values(&a[&order.column], &b[&order.column]);
                let ord = if order.ascending { ord } else { ord.reverse() };
                if ord != CmpOrdering::Equal {
                    return ord;
                }
            }
            CmpOrdering::Equal
        });

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn upsert(
        &self,
        table: &str,
        record: Value,
        conflict_key: &str,
        on_conflict: OnConflict,
    ) -> Result<Option<Value>, StoreError> {
        self.enter(StoreOp::Upsert).await?;

        let fields = into_object(record)?;
        let key = fields
            .get(conflict_key)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| StoreError::Rejected {
                status: 400,
                message: format!("missing conflict key '{}'", conflict_key),
            })?;

        let mut tables = self.lock()?;
        let existing = tables
            .rows
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row[conflict_key] == key));

        if let Some(row) = existing {
            return Ok(match on_conflict {
                OnConflict::Ignore => None,
                OnConflict::Merge => {
                    merge(row, fields);
                    Some(row.clone())
                }
            });
        }

        let row = assign_id(&mut tables, Value::Object(fields));
        tables.rows.entry(table.to_string()).or_default().push(row.clone());
        Ok(Some(row))
    }

    async fn update(&self, table: &str, fields: Value, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        self.enter(StoreOp::Update).await?;

        let fields = into_object(fields)?;
        let mut tables = self.lock()?;
        let mut updated = Vec::new();
        if let Some(rows) = tables.rows.get_mut(table) {
            for row in rows.iter_mut().filter(|row| matches_filter(row, filter)) {
                merge(row, fields.clone());
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn rpc(&self, name: &str, args: Value) -> Result<Value, StoreError> {
        self.enter(StoreOp::Rpc).await?;

        let counter = self
            .counters
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| StoreError::Unsupported(name.to_string()))?;

        let id = args[&counter.id_arg].clone();
        let increment = args[&counter.flag_arg].as_bool().ok_or_else(|| StoreError::Rejected {
            status: 400,
            message: format!("'{}' must be a boolean", counter.flag_arg),
        })?;

        let mut tables = self.lock()?;
        let row = tables
            .rows
            .get_mut(&counter.table)
            .and_then(|rows| rows.iter_mut().find(|row| row["id"] == id))
            .ok_or_else(|| StoreError::Rejected {
                status: 400,
                message: format!("no {} row with id {}", counter.table, id),
            })?;

        let current = row[&counter.column].as_u64().unwrap_or(0);
        let next = if increment {
            current.saturating_add(1)
        } else {
            current.saturating_sub(1)
        };
        row[&counter.column] = Value::from(next);
        Ok(Value::from(next))
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Rejected {
            status: 400,
            message: format!("expected a JSON object, got {}", other),
        }),
    }
}

fn assign_id(tables: &mut Tables, mut row: Value) -> Value {
    if let Value::Object(map) = &mut row {
        match map.get("id").and_then(Value::as_u64) {
            Some(id) => tables.next_id = tables.next_id.max(id),
            None => {
                tables.next_id += 1;
                map.insert("id".to_string(), Value::from(tables.next_id));
            }
        }
    }
    row
}

fn merge(row: &mut Value, fields: Map<String, Value>) {
    if let Value::Object(target) = row {
        target.extend(fields);
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    let field = &row[filter.column()];
    let expected = Value::String(filter.value().to_string());
    match filter {
        Filter::Eq(..) => compare_values(field, &expected) == CmpOrdering::Equal,
        Filter::Lte(..) => !field.is_null() && compare_values(field, &expected) != CmpOrdering::Greater,
    }
}

/// Numbers compare numerically (numeric strings included), everything else as text
fn compare_values(a: &Value, b: &Value) -> CmpOrdering {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(CmpOrdering::Equal),
        _ => as_text(a).cmp(&as_text(b)),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Order;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_merges_or_ignores_on_conflict_key() {
        let store = MemoryStore::new();
        store
            .upsert("t", json!({"email": "a@b.co", "plan": "free"}), "email", OnConflict::Merge)
            .await
            .unwrap();

        let ignored = store
            .upsert("t", json!({"email": "a@b.co", "plan": "pro"}), "email", OnConflict::Ignore)
            .await
            .unwrap();
        assert!(ignored.is_none());
        assert_eq!(store.rows("t")[0]["plan"], "free");

        let merged = store
            .upsert("t", json!({"email": "a@b.co", "plan": "pro"}), "email", OnConflict::Merge)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged["plan"], "pro");
        assert_eq!(store.rows("t").len(), 1);
    }

    #[tokio::test]
    async fn select_filters_orders_and_limits() {
        let store = MemoryStore::new();
        store.insert("s", json!({"id": 1, "publish_date": "2025-11-01"}));
        store.insert("s", json!({"id": 2, "publish_date": "2025-11-03"}));
        store.insert("s", json!({"id": 3, "publish_date": "2025-11-03"}));
        store.insert("s", json!({"id": 4, "publish_date": "2025-12-01"}));

        let query = Query::new()
            .filter(Filter::lte("publish_date", "2025-11-03"))
            .order_by(Order::desc("publish_date"))
            .order_by(Order::desc("id"));
        let ids: Vec<u64> = store
            .select("s", &query)
            .await
            .unwrap()
            .iter()
            .map(|r| r["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let row = store.get("s", &Filter::eq("id", 4)).await.unwrap().unwrap();
        assert_eq!(row["publish_date"], "2025-12-01");
    }

    #[tokio::test]
    async fn counter_rpc_adjusts_column() {
        let store = MemoryStore::new().with_counter_rpc(CounterRpc::toggle_likes());
        store.insert(STICKERS_TABLE, json!({"id": 9, "likes": 0}));

        let up = store
            .rpc(TOGGLE_LIKES_RPC, json!({"sticker_id": 9, "should_increment": true}))
            .await
            .unwrap();
        assert_eq!(up, json!(1));

        store
            .rpc(TOGGLE_LIKES_RPC, json!({"sticker_id": 9, "should_increment": false}))
            .await
            .unwrap();
        let down = store
            .rpc(TOGGLE_LIKES_RPC, json!({"sticker_id": 9, "should_increment": false}))
            .await
            .unwrap();
        assert_eq!(down, json!(0));
    }

    #[tokio::test]
    async fn unknown_rpc_is_unsupported_and_offline_is_unreachable() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.rpc("nope", json!({})).await,
            Err(StoreError::Unsupported(_))
        ));

        store.set_offline(true);
        assert!(matches!(
            store.select("s", &Query::new()).await,
            Err(StoreError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn update_returns_only_matched_rows() {
        let store = MemoryStore::new();
        store.insert("s", json!({"id": 1, "likes": 3}));

        let updated = store
            .update("s", json!({"likes": 4}), &Filter::eq("id", 1))
            .await
            .unwrap();
        assert_eq!(updated, vec![json!({"id": 1, "likes": 4})]);

        let missed = store
            .update("s", json!({"likes": 9}), &Filter::eq("id", 42))
            .await
            .unwrap();
        assert!(missed.is_empty());
    }

    #[tokio::test]
    async fn injected_failure_hits_one_operation_until_recovered() {
        let store = MemoryStore::new().with_counter_rpc(CounterRpc::toggle_likes());
        store.insert(STICKERS_TABLE, json!({"id": 1, "likes": 0}));
        let rejected = StoreError::Rejected {
            status: 500,
            message: "function crashed".to_string(),
        };
        store.fail(StoreOp::Rpc, rejected.clone());

        let args = json!({"sticker_id": 1, "should_increment": true});
        assert_eq!(store.rpc(TOGGLE_LIKES_RPC, args.clone()).await, Err(rejected));
        assert_eq!(store.select(STICKERS_TABLE, &Query::new()).await.unwrap().len(), 1);

        store.recover(StoreOp::Rpc);
        assert_eq!(store.rpc(TOGGLE_LIKES_RPC, args).await, Ok(json!(1)));
    }
}
