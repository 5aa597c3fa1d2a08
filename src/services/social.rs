//! Like counter service for sticker likes
//!
//! Keeps the viewer-local liked flag and the shared backend counter in step:
//! - at most one toggle in flight per item (a second request is rejected)
//! - atomic backend increment first, absolute read-modify-write as fallback
//! - when every strategy fails nothing is persisted and the caller keeps its old state

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::constants::{
    COMPACT_COUNT_THRESHOLD, STICKERS_TABLE, STICKER_LIKES_COLUMN, TOGGLE_LIKES_FLAG_ARG,
    TOGGLE_LIKES_ID_ARG, TOGGLE_LIKES_RPC,
};
use crate::error::{CoreError, CoreResult, StoreError};
use crate::models::LikeState;
use crate::store::{Filter, RecordStore};
use crate::utils::error_handling::safe_lock;
use crate::utils::liked_store::LikedStore;

/// Ways of pushing a toggle to the backend, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CounterStrategy {
    /// Server-side increment/decrement, safe against concurrent viewers
    AtomicRpc,
    /// Overwrite the absolute count and adopt the row the backend stored. Can lose concurrent updates.
    ReadModifyWrite,
}

const STRATEGIES: [CounterStrategy; 2] = [CounterStrategy::AtomicRpc, CounterStrategy::ReadModifyWrite];

pub struct LikeCounter {
    store: Arc<dyn RecordStore>,
    liked: Arc<dyn LikedStore>,
    pending: Mutex<HashSet<u64>>,
}

/// Marks an item as in flight; released on drop, including when the toggle future is dropped
struct PendingGuard<'a> {
    pending: &'a Mutex<HashSet<u64>>,
    item_id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut pending) = safe_lock(self.pending, "Like") {
            pending.remove(&self.item_id);
        }
    }
}

impl LikeCounter {
    pub fn new(store: Arc<dyn RecordStore>, liked: Arc<dyn LikedStore>) -> Self {
        Self {
            store,
            liked,
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// Initial state for an item: backend count plus this device's liked flag
    pub fn load_state(&self, item_id: u64, count: u64) -> LikeState {
        LikeState::new(item_id, count, self.liked.is_liked(item_id))
    }

    pub fn is_pending(&self, item_id: u64) -> bool {
        safe_lock(&self.pending, "Like")
            .map(|pending| pending.contains(&item_id))
            .unwrap_or(false)
    }

    fn begin(&self, item_id: u64) -> CoreResult<PendingGuard<'_>> {
        let mut pending = safe_lock(&self.pending, "Like")
            .ok_or_else(|| CoreError::Persistence("pending set unavailable".to_string()))?;
        if !pending.insert(item_id) {
            log::debug!("[Like] Toggle for sticker {} already in flight, ignoring", item_id);
            return Err(CoreError::ToggleInFlight(item_id));
        }
        Ok(PendingGuard {
            pending: &self.pending,
            item_id,
        })
    }

    /// Flip the viewer's like on `current.item_id`.
    ///
    /// Returns the settled state carrying the backend's count. On error the
    /// caller's `current` is still the correct state to show.
    pub async fn toggle_like(&self, current: &LikeState) -> CoreResult<LikeState> {
        let _guard = self.begin(current.item_id)?;
        let optimistic = current.optimistic();
        let item_id = current.item_id;

        log::info!(
            "[Like] {} sticker {} (optimistic count {})",
            if optimistic.liked_by_viewer { "Liking" } else { "Unliking" },
            item_id,
            optimistic.count
        );

        let mut last_error = None;
        for strategy in STRATEGIES {
            match self.apply(strategy, &optimistic).await {
                Ok(count) => {
                    if let Err(e) = self.liked.set_liked(item_id, optimistic.liked_by_viewer) {
                        log::warn!("[Like] Failed to remember flag for sticker {}: {}", item_id, e);
                    }
                    log::info!("[Like] Sticker {} settled at {} via {:?}", item_id, count, strategy);
                    return Ok(LikeState::new(item_id, count, optimistic.liked_by_viewer));
                }
                Err(e) => {
                    log::warn!("[Like] {:?} failed for sticker {}: {}", strategy, item_id, e);
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no strategy available".to_string());
        log::error!(
            "[Like] Toggle for sticker {} failed, keeping count {}: {}",
            item_id,
            current.count,
            reason
        );
        Err(CoreError::Persistence(reason))
    }

    async fn apply(&self, strategy: CounterStrategy, optimistic: &LikeState) -> Result<u64, StoreError> {
        match strategy {
            CounterStrategy::AtomicRpc => {
                let args = json!({
                    TOGGLE_LIKES_ID_ARG: optimistic.item_id,
                    TOGGLE_LIKES_FLAG_ARG: optimistic.liked_by_viewer,
                });
                let value = self.store.rpc(TOGGLE_LIKES_RPC, args).await?;
                count_from_rpc(value, optimistic.count)
            }
            CounterStrategy::ReadModifyWrite => {
                let key = Filter::eq("id", optimistic.item_id);
                let rows = self
                    .store
                    .update(STICKERS_TABLE, json!({ STICKER_LIKES_COLUMN: optimistic.count }), &key)
                    .await?;

                // Zero matched rows means nothing was written
                let row = rows.into_iter().next().ok_or_else(|| StoreError::Rejected {
                    status: 404,
                    message: format!("no sticker with id {}", optimistic.item_id),
                })?;
                count_from_row(&row)
            }
        }
    }
}

fn count_from_row(row: &Value) -> Result<u64, StoreError> {
    match &row[STICKER_LIKES_COLUMN] {
        Value::Null => Ok(0),
        Value::Number(n) => Ok(n.as_u64().unwrap_or(0)),
        other => Err(StoreError::Malformed(format!("unexpected likes value {}", other))),
    }
}

fn count_from_rpc(value: Value, optimistic: u64) -> Result<u64, StoreError> {
    match value {
        // function ran but returned nothing
        Value::Null => Ok(optimistic),
        Value::Number(n) => Ok(n.as_u64().unwrap_or(0)),
        other => Err(StoreError::Malformed(format!("unexpected counter value {}", other))),
    }
}

/// Like count for display: as-is below 1000, one-decimal "k" at or above
pub fn format_count(count: u64) -> String {
    if count >= COMPACT_COUNT_THRESHOLD {
        format!("{:.1}k", count as f64 / 1000.0)
    } else {
        count.to_string()
    }
}
