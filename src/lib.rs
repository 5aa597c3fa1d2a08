//! StickerDrop storefront core
//!
//! Subscription tier gating, sticker like counters, and the catalog/profile
//! reads behind the daily AI sticker storefront. Everything talks to a hosted
//! record store through [`store::RecordStore`]; the viewer's own liked flags
//! live on the device in [`utils::liked_store`].

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;

pub use app::Storefront;
pub use config::BackendConfig;
pub use error::{CoreError, CoreResult, StoreError};
pub use models::{LikeState, Plan, Sticker, SubscriptionRecord, UserProfile};

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "StickerDrop";
