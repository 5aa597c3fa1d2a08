use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;

use crate::models::LikeState;
use crate::services::social::{format_count, LikeCounter};
use crate::utils::async_helper::{spawn_and_send, AsyncTaskResult};

/// How a background toggle ended
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Backend accepted; the displayed count is now the backend's
    Confirmed(LikeState),
    /// Toggle failed; the pre-click state is shown again
    RolledBack(String),
}

/// Heart button for one sticker, driven by UI event callbacks
///
/// `click()` shows the optimistic guess immediately and runs the toggle on a
/// background runtime; `poll()` (called every frame/tick) settles it.
/// Dropping the state drops the receiver, so a late response is discarded.
pub struct LikeButtonState {
    counter: Arc<LikeCounter>,
    pub item_id: u64,
    pub count: u64,
    pub liked: bool,
    pub is_loading: bool,
    settled: LikeState,
    toggle_rx: Option<Receiver<AsyncTaskResult<LikeState>>>,
}

impl LikeButtonState {
    pub fn new(counter: Arc<LikeCounter>, item_id: u64, initial_count: u64) -> Self {
        let settled = counter.load_state(item_id, initial_count);
        Self {
            counter,
            item_id,
            count: settled.count,
            liked: settled.liked_by_viewer,
            is_loading: false,
            settled,
            toggle_rx: None,
        }
    }

    pub fn display_count(&self) -> String {
        format_count(self.count)
    }

    /// Fresh count from a page reload; ignored while a toggle is pending
    pub fn refresh_count(&mut self, count: u64) {
        if self.is_loading {
            return;
        }
        self.settled.count = count;
        self.count = count;
    }

    /// Returns false when the click was dropped because a toggle is still pending
    pub fn click(&mut self) -> bool {
        if self.is_loading {
            log::debug!("[LikeButton] Sticker {} busy, click dropped", self.item_id);
            return false;
        }

        let snapshot = self.settled;
        let guess = snapshot.optimistic();
        self.count = guess.count;
        self.liked = guess.liked_by_viewer;
        self.is_loading = true;

        let (tx, rx) = channel();
        let counter = Arc::clone(&self.counter);
        spawn_and_send(
            move || {
                Box::pin(async move {
                    counter
                        .toggle_like(&snapshot)
                        .await
                        .map_err(|e| e.to_string())
                })
            },
            tx,
        );
        self.toggle_rx = Some(rx);
        true
    }

    /// Settle a finished toggle, if any
    pub fn poll(&mut self) -> Option<Settlement> {
        let outcome = match self.toggle_rx.as_ref()?.try_recv() {
            Ok(Ok(state)) => {
                self.settled = state;
                Settlement::Confirmed(state)
            }
            Ok(Err(e)) => Settlement::RolledBack(e),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                Settlement::RolledBack("like task ended without a result".to_string())
            }
        };

        self.count = self.settled.count;
        self.liked = self.settled.liked_by_viewer;
        self.is_loading = false;
        self.toggle_rx = None;

        if let Settlement::RolledBack(reason) = &outcome {
            log::warn!("[LikeButton] Sticker {} reverted: {}", self.item_id, reason);
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STICKERS_TABLE;
    use crate::store::{CounterRpc, MemoryStore};
    use crate::utils::liked_store::MemoryLikedStore;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn counter_with(store: Arc<MemoryStore>) -> Arc<LikeCounter> {
        Arc::new(LikeCounter::new(store, Arc::new(MemoryLikedStore::new())))
    }

    fn wait_for_settlement(button: &mut LikeButtonState) -> Settlement {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(settlement) = button.poll() {
                return settlement;
            }
            assert!(Instant::now() < deadline, "toggle never settled");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn click_shows_guess_then_confirms() {
        let store = Arc::new(
            MemoryStore::new()
                .with_counter_rpc(CounterRpc::toggle_likes())
                .with_latency(Duration::from_millis(30)),
        );
        store.insert(STICKERS_TABLE, json!({"id": 1, "likes": 999}));
        let mut button = LikeButtonState::new(counter_with(store), 1, 999);

        assert!(button.click());
        assert_eq!((button.count, button.liked, button.is_loading), (1000, true, true));
        assert_eq!(button.display_count(), "1.0k");
        assert!(!button.click(), "second click while pending must be dropped");

        let settlement = wait_for_settlement(&mut button);
        assert_eq!(settlement, Settlement::Confirmed(LikeState::new(1, 1000, true)));
        assert!(!button.is_loading);
    }

    #[test]
    fn failure_restores_previous_state() {
        let store = Arc::new(MemoryStore::new().with_counter_rpc(CounterRpc::toggle_likes()));
        store.insert(STICKERS_TABLE, json!({"id": 2, "likes": 5}));
        store.set_offline(true);
        let mut button = LikeButtonState::new(counter_with(store), 2, 5);

        assert!(button.click());
        assert_eq!(button.count, 6);

        assert!(matches!(wait_for_settlement(&mut button), Settlement::RolledBack(_)));
        assert_eq!((button.count, button.liked, button.is_loading), (5, false, false));
        assert!(button.click(), "button accepts clicks again after settling");
    }

    #[test]
    fn dropped_button_discards_late_response() {
        let store = Arc::new(
            MemoryStore::new()
                .with_counter_rpc(CounterRpc::toggle_likes())
                .with_latency(Duration::from_millis(20)),
        );
        store.insert(STICKERS_TABLE, json!({"id": 3, "likes": 0}));
        let counter = counter_with(store.clone());

        let mut button = LikeButtonState::new(Arc::clone(&counter), 3, 0);
        assert!(button.click());
        drop(button);

        let deadline = Instant::now() + Duration::from_secs(5);
        while counter.is_pending(3) || store.rows(STICKERS_TABLE)[0]["likes"] != json!(1) {
            assert!(Instant::now() < deadline, "background toggle never finished");
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}
