use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A daily sticker drop
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Sticker {
    pub id: u64,
    pub title: String,
    pub prompt: String,
    pub image_url: String,
    pub publish_date: NaiveDate,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub is_premium: bool,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub likes: u64,
    #[serde(default)]
    pub remix_idea: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nullable_columns_default() {
        let sticker: Sticker = serde_json::from_value(json!({
            "id": 4,
            "title": "Sleepy Cat",
            "prompt": "a sleepy cat sticker",
            "image_url": "sleepy-cat.png",
            "publish_date": "2025-11-04",
            "is_premium": null,
            "likes": null
        }))
        .unwrap();

        assert_eq!(sticker.likes, 0);
        assert!(!sticker.is_premium);
        assert!(sticker.remix_idea.is_none());
        assert_eq!(sticker.publish_date, NaiveDate::from_ymd_opt(2025, 11, 4).unwrap());
    }
}
