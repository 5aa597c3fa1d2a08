use serde::{Deserialize, Serialize};

/// Like counter as seen by one viewer for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub item_id: u64,
    /// Shared counter owned by the backend record
    pub count: u64,
    /// Viewer-local flag, never the source of truth for `count`
    pub liked_by_viewer: bool,
}

impl LikeState {
    pub fn new(item_id: u64, count: u64, liked_by_viewer: bool) -> Self {
        Self {
            item_id,
            count,
            liked_by_viewer,
        }
    }

    /// The guess applied before the backend confirms a toggle
    pub fn optimistic(&self) -> LikeState {
        let liked = !self.liked_by_viewer;
        let count = if liked {
            self.count.saturating_add(1)
        } else {
            self.count.saturating_sub(1)
        };
        LikeState::new(self.item_id, count, liked)
    }
}
