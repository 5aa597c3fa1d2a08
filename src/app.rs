//! Storefront wiring: one record store shared by every service

use std::sync::Arc;

use crate::config::BackendConfig;
use crate::error::CoreResult;
use crate::services::{Catalog, LikeCounter, ProfileService, SubscriptionService};
use crate::store::{RecordStore, RestStore};
use crate::utils::liked_store::{LikedStickersDB, LikedStore};

pub struct Storefront {
    pub config: BackendConfig,
    pub catalog: Catalog,
    pub subscriptions: SubscriptionService,
    pub profiles: ProfileService,
    pub likes: Arc<LikeCounter>,
}

impl Storefront {
    /// Connect to the configured backend and open this device's liked-flag database
    pub fn connect(config: BackendConfig) -> CoreResult<Self> {
        let store: Arc<dyn RecordStore> = Arc::new(RestStore::new(&config)?);
        let liked: Arc<dyn LikedStore> = Arc::new(LikedStickersDB::open(&config.liked_db_path)?);
        Ok(Self::with_stores(config, store, liked))
    }

    pub fn with_stores(
        config: BackendConfig,
        store: Arc<dyn RecordStore>,
        liked: Arc<dyn LikedStore>,
    ) -> Self {
        Self {
            catalog: Catalog::new(Arc::clone(&store)),
            subscriptions: SubscriptionService::new(Arc::clone(&store)),
            profiles: ProfileService::new(Arc::clone(&store)),
            likes: Arc::new(LikeCounter::new(store, liked)),
            config,
        }
    }
}
