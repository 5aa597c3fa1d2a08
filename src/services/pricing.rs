//! Pricing page offers and what pressing "subscribe" does for a given viewer
//!
//! Payment itself happens behind an external checkout link.

use crate::config::BackendConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::Plan;
use crate::services::tiers::is_current_or_included_plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanDetails {
    pub plan: Plan,
    pub price: &'static str,
    pub period: &'static str,
    pub description: &'static str,
    pub popular: bool,
}

pub const PLAN_CATALOG: [PlanDetails; 3] = [
    PlanDetails {
        plan: Plan::Free,
        price: "$0",
        period: "forever",
        description: "Daily stickers and the public archive",
        popular: false,
    },
    PlanDetails {
        plan: Plan::Pro,
        price: "$9",
        period: "month",
        description: "Premium prompts and 4K transparent PNGs",
        popular: true,
    },
    PlanDetails {
        plan: Plan::Studio,
        price: "$29",
        period: "month",
        description: "Everything in Pro plus team collaboration",
        popular: false,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferBadge {
    Current,
    Included,
    Available,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanOffer {
    pub details: PlanDetails,
    pub badge: OfferBadge,
}

impl PlanOffer {
    /// Subscribe button disabled
    pub fn is_disabled(&self) -> bool {
        self.badge != OfferBadge::Available
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeAction {
    /// Viewer already has this plan or a plan that includes it
    AlreadyIncluded,
    SignInRequired { callback: String },
    ActivateFree,
    Checkout(String),
    ContactSales(String),
}

/// Offers as the viewer sees them; badges only apply to signed-in viewers
pub fn plan_offers(user_plan: Plan, authenticated: bool) -> Vec<PlanOffer> {
    PLAN_CATALOG
        .iter()
        .map(|details| {
            let badge = if !authenticated {
                OfferBadge::Available
            } else if details.plan == user_plan {
                OfferBadge::Current
            } else if is_current_or_included_plan(user_plan, details.plan) {
                OfferBadge::Included
            } else {
                OfferBadge::Available
            };
            PlanOffer {
                details: *details,
                badge,
            }
        })
        .collect()
}

pub fn subscribe_action(
    user_plan: Plan,
    target: Plan,
    authenticated: bool,
    config: &BackendConfig,
) -> CoreResult<SubscribeAction> {
    if authenticated && is_current_or_included_plan(user_plan, target) {
        return Ok(SubscribeAction::AlreadyIncluded);
    }

    if target.is_paid() && !authenticated {
        let callback = format!("/pricing?plan={}", target);
        return Ok(SubscribeAction::SignInRequired {
            callback: urlencoding::encode(&callback).into_owned(),
        });
    }

    match target {
        Plan::Free => Ok(SubscribeAction::ActivateFree),
        Plan::Pro => config
            .checkout_url
            .clone()
            .map(SubscribeAction::Checkout)
            .ok_or_else(|| CoreError::Config("no checkout link configured for Pro".to_string())),
        Plan::Studio => Ok(SubscribeAction::ContactSales(format!(
            "mailto:{}?subject={}",
            config.studio_contact,
            urlencoding::encode("Studio plan inquiry")
        ))),
    }
}
