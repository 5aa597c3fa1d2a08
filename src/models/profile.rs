use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Row of the `user_profiles` table
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_links")]
    pub social_links: Vec<String>,
    #[serde(default)]
    pub member_since: Option<String>,
    #[serde(default)]
    pub last_updated_at: Option<String>,
}

/// Editable profile fields; `None` leaves the stored value untouched
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_links: Option<Vec<String>>,
}

// social_links is a JSON column; anything that isn't an array of strings reads as empty
fn lenient_links<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn social_links_must_be_string_array() {
        let profile: UserProfile = serde_json::from_value(json!({
            "user_id": "abc",
            "email": "a@b.co",
            "social_links": "https://not-an-array"
        }))
        .unwrap();
        assert!(profile.social_links.is_empty());

        let profile: UserProfile = serde_json::from_value(json!({
            "user_id": "abc",
            "social_links": ["https://x.com/a", 4, "https://github.com/a"]
        }))
        .unwrap();
        assert_eq!(profile.social_links, vec!["https://x.com/a", "https://github.com/a"]);
    }

    #[test]
    fn null_user_id_reads_as_empty() {
        let profile: UserProfile = serde_json::from_value(json!({
            "user_id": null,
            "email": "a@b.co",
            "display_name": "Ada"
        }))
        .unwrap();
        assert_eq!(profile.user_id, "");
        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn update_skips_untouched_fields() {
        let update = ProfileUpdate {
            bio: Some("sticker nerd".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "bio": "sticker nerd" }));
    }
}
