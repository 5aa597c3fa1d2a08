//! Services module - business logic layer
//!
//! Services hold the storefront rules and talk to the record store; callers
//! (pages, the CLI) stay thin and pass identifiers in explicitly.

pub mod catalog;
pub mod identity;
pub mod pricing;
pub mod profiles;
pub mod social;
pub mod tiers;

// Re-export commonly used types
pub use catalog::{image_url, prompt_access, Catalog, PromptAccess};
pub use identity::{resolve_identifier, Identifier, Session};
pub use pricing::{plan_offers, subscribe_action, OfferBadge, PlanOffer, SubscribeAction};
pub use profiles::{default_profile, ProfileKey, ProfileService};
pub use social::{format_count, LikeCounter};
pub use tiers::{can_access_plan, is_current_or_included_plan, SubscriptionService};
