//! Tier resolver - subscription plan lookups and paywall checks

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use crate::constants::{DEFAULT_SUBSCRIPTION_STATUS, SUBSCRIPTIONS_TABLE, SUBSCRIPTION_KEY_COLUMN};
use crate::error::CoreResult;
use crate::models::Plan;
use crate::services::identity::Identifier;
use crate::store::{Filter, OnConflict, RecordStore};

/// Whether a viewer on `user_plan` can use what `target` unlocks
pub fn can_access_plan(user_plan: Plan, target: Plan) -> bool {
    match target {
        Plan::Free => true,
        Plan::Pro => matches!(user_plan, Plan::Pro | Plan::Studio),
        Plan::Studio => user_plan == Plan::Studio,
    }
}

/// Whether `target` is the viewer's plan or already subsumed by it (subscribe button disabled)
pub fn is_current_or_included_plan(user_plan: Plan, target: Plan) -> bool {
    match user_plan {
        Plan::Studio => true,
        Plan::Pro => matches!(target, Plan::Free | Plan::Pro),
        Plan::Free => target == Plan::Free,
    }
}

pub struct SubscriptionService {
    store: Arc<dyn RecordStore>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Current plan for `identifier`, creating a free record on first sight.
    ///
    /// Creation is an ignore-on-conflict upsert, so racing first calls converge
    /// on one row. Read failures fall back to `Free`.
    pub async fn resolve_plan(&self, identifier: &Identifier) -> Plan {
        let key = Filter::eq(SUBSCRIPTION_KEY_COLUMN, identifier);

        match self.store.get(SUBSCRIPTIONS_TABLE, &key).await {
            Ok(Some(row)) => return plan_from_row(row),
            Ok(None) => {}
            Err(e) => {
                log::error!("[Tiers] Failed to read plan for {}: {}", identifier, e);
                return Plan::Free;
            }
        }

        log::info!("[Tiers] No subscription for {}, creating free record", identifier);
        let record = json!({
            SUBSCRIPTION_KEY_COLUMN: identifier.as_str(),
            "plan": Plan::Free,
            "subscription_status": DEFAULT_SUBSCRIPTION_STATUS,
            "updated_at": Utc::now().to_rfc3339(),
        });

        match self
            .store
            .upsert(SUBSCRIPTIONS_TABLE, record, SUBSCRIPTION_KEY_COLUMN, OnConflict::Ignore)
            .await
        {
            Ok(Some(row)) => plan_from_row(row),
            Ok(None) => {
                // Another request created the row first; report what it stored
                log::debug!("[Tiers] Record for {} already created concurrently", identifier);
                match self.store.get(SUBSCRIPTIONS_TABLE, &key).await {
                    Ok(Some(row)) => plan_from_row(row),
                    _ => Plan::Free,
                }
            }
            Err(e) => {
                log::warn!("[Tiers] Failed to create free record for {}: {}", identifier, e);
                Plan::Free
            }
        }
    }

    /// Set the plan for `identifier`. No retry; failures go back to the caller.
    pub async fn update_plan(&self, identifier: &Identifier, plan: Plan) -> CoreResult<()> {
        let record = json!({
            SUBSCRIPTION_KEY_COLUMN: identifier.as_str(),
            "plan": plan,
            "subscription_status": DEFAULT_SUBSCRIPTION_STATUS,
            "updated_at": Utc::now().to_rfc3339(),
        });

        self.store
            .upsert(SUBSCRIPTIONS_TABLE, record, SUBSCRIPTION_KEY_COLUMN, OnConflict::Merge)
            .await
            .map_err(|e| {
                log::error!("[Tiers] Failed to save plan {} for {}: {}", plan, identifier, e);
                e
            })?;

        log::info!("[Tiers] {} is now on {}", identifier, plan);
        Ok(())
    }
}

// Only the plan column decides access; the rest of the row may use any timestamp format
fn plan_from_row(row: Value) -> Plan {
    match serde_json::from_value::<Plan>(row["plan"].clone()) {
        Ok(plan) => plan,
        Err(e) => {
            log::warn!("[Tiers] Unreadable plan {}, treating as free: {}", row["plan"], e);
            Plan::Free
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    #[test]
    fn access_follows_rank() {
        for user in Plan::ALL {
            for target in Plan::ALL {
                assert_eq!(
                    can_access_plan(user, target),
                    user.rank() >= target.rank(),
                    "{user} -> {target}"
                );
            }
        }
    }

    #[test]
    fn inclusion_table() {
        for target in Plan::ALL {
            assert!(is_current_or_included_plan(Plan::Studio, target));
        }
        assert!(!is_current_or_included_plan(Plan::Pro, Plan::Studio));
        assert!(is_current_or_included_plan(Plan::Pro, Plan::Pro));
        assert!(is_current_or_included_plan(Plan::Pro, Plan::Free));
        assert!(is_current_or_included_plan(Plan::Free, Plan::Free));
        assert!(!is_current_or_included_plan(Plan::Free, Plan::Pro));
        assert!(!is_current_or_included_plan(Plan::Free, Plan::Studio));
    }

    fn id(email: &str) -> Identifier {
        Identifier::email(email).unwrap()
    }

    #[tokio::test]
    async fn resolve_creates_one_free_record_under_racing_first_calls() {
        let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(5)));
        let service = SubscriptionService::new(store.clone());
        let ada = id("ada@example.com");

        let (a, b) = tokio::join!(service.resolve_plan(&ada), service.resolve_plan(&ada));
        assert_eq!((a, b), (Plan::Free, Plan::Free));
        assert_eq!(service.resolve_plan(&ada).await, Plan::Free);

        let rows = store.rows(SUBSCRIPTIONS_TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["subscription_status"], "active");
    }

    #[tokio::test]
    async fn update_then_resolve_returns_new_plan() {
        let store = Arc::new(MemoryStore::new());
        let service = SubscriptionService::new(store.clone());
        let ada = id("ada@example.com");

        assert_eq!(service.resolve_plan(&ada).await, Plan::Free);
        service.update_plan(&ada, Plan::Studio).await.unwrap();
        assert_eq!(service.resolve_plan(&ada).await, Plan::Studio);
        assert_eq!(store.rows(SUBSCRIPTIONS_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn unreachable_store_degrades_reads_and_fails_writes() {
        let store = Arc::new(MemoryStore::new());
        let service = SubscriptionService::new(store.clone());
        let ada = id("ada@example.com");
        service.update_plan(&ada, Plan::Pro).await.unwrap();

        store.set_offline(true);
        assert_eq!(service.resolve_plan(&ada).await, Plan::Free);
        assert!(matches!(
            service.update_plan(&ada, Plan::Studio).await,
            Err(crate::error::CoreError::Persistence(_))
        ));

        store.set_offline(false);
        assert_eq!(service.resolve_plan(&ada).await, Plan::Pro);
    }

    #[tokio::test]
    async fn unknown_stored_plan_reads_as_free() {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            SUBSCRIPTIONS_TABLE,
            json!({"email": "ada@example.com", "plan": "platinum"}),
        );
        let service = SubscriptionService::new(store);
        assert_eq!(service.resolve_plan(&id("ada@example.com")).await, Plan::Free);
    }

    #[tokio::test]
    async fn paid_plan_survives_timestamp_without_timezone() {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            SUBSCRIPTIONS_TABLE,
            json!({
                "email": "ada@example.com",
                "plan": "studio",
                "updated_at": "2025-11-02T10:00:00.123456"
            }),
        );
        let service = SubscriptionService::new(store);
        assert_eq!(service.resolve_plan(&id("ada@example.com")).await, Plan::Studio);
    }
}
