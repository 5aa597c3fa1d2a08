// Data models for storefront backend records

use serde::{Deserialize, Deserializer};

pub mod like;
pub mod plan;
pub mod profile;
pub mod sticker;

// Re-export commonly used types
pub use like::LikeState;
pub use plan::{Plan, SubscriptionRecord};
pub use profile::{ProfileUpdate, UserProfile};
pub use sticker::Sticker;

/// Nullable columns decode to the type's default (null likes → 0, null premium flag → false)
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
