//! Sticker catalog reads: today's drop, the archive grid and detail pages
//!
//! Reads never fail outward. Backend errors are logged and the caller gets
//! an empty result, which the pages render as "nothing here yet".

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use crate::constants::{STICKERS_TABLE, STICKER_IMAGE_PATH};
use crate::models::{Plan, Sticker};
use crate::services::tiers::can_access_plan;
use crate::store::{Filter, Order, Query, RecordStore};

/// What the detail page may show of a sticker's prompt
#[derive(Debug, Clone, PartialEq)]
pub enum PromptAccess {
    Visible(String),
    /// Premium prompt, viewer needs a paid plan
    Locked,
}

/// Premium prompts require Pro or better; everything else is public
pub fn prompt_access(sticker: &Sticker, plan: Plan) -> PromptAccess {
    if sticker.is_premium && !can_access_plan(plan, Plan::Pro) {
        PromptAccess::Locked
    } else {
        PromptAccess::Visible(sticker.prompt.clone())
    }
}

/// Full image URL; bare file names live in the public stickers bucket
pub fn image_url(base_url: &str, image: &str) -> String {
    if image.starts_with("http://") || image.starts_with("https://") {
        return image.to_string();
    }
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        STICKER_IMAGE_PATH,
        image.trim_start_matches('/')
    )
}

pub struct Catalog {
    store: Arc<dyn RecordStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Latest sticker published on or before `today` (highest id wins within a day)
    pub async fn today_sticker(&self, today: NaiveDate) -> Option<Sticker> {
        let query = Query::new()
            .filter(Filter::lte("publish_date", today.format("%Y-%m-%d")))
            .order_by(Order::desc("publish_date"))
            .order_by(Order::desc("id"))
            .limit(1);

        self.fetch(&query, "today")
            .await
            .into_iter()
            .next()
    }

    /// Every sticker, newest first
    pub async fn archive(&self) -> Vec<Sticker> {
        let query = Query::new()
            .order_by(Order::desc("publish_date"))
            .order_by(Order::desc("id"));
        self.fetch(&query, "archive").await
    }

    /// Detail lookup from a raw path segment; non-numeric ids never hit the backend
    pub async fn sticker_by_id(&self, raw_id: &str) -> Option<Sticker> {
        let id: u64 = match raw_id.trim().parse() {
            Ok(id) => id,
            Err(_) => {
                log::debug!("[Catalog] Ignoring non-numeric sticker id {:?}", raw_id);
                return None;
            }
        };

        match self.store.get(STICKERS_TABLE, &Filter::eq("id", id)).await {
            Ok(Some(row)) => decode(row),
            Ok(None) => None,
            Err(e) => {
                log::error!("[Catalog] Failed to fetch sticker {}: {}", id, e);
                None
            }
        }
    }

    async fn fetch(&self, query: &Query, context: &str) -> Vec<Sticker> {
        match self.store.select(STICKERS_TABLE, query).await {
            Ok(rows) => {
                let stickers: Vec<Sticker> = rows.into_iter().filter_map(decode).collect();
                log::debug!("[Catalog] {}: {} stickers", context, stickers.len());
                stickers
            }
            Err(e) => {
                log::error!("[Catalog] Failed to fetch {}: {}", context, e);
                Vec::new()
            }
        }
    }
}

fn decode(row: Value) -> Option<Sticker> {
    serde_json::from_value(row)
        .map_err(|e| log::warn!("[Catalog] Skipping unreadable sticker row: {}", e))
        .ok()
}
