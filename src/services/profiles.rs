//! Profile reads and writes, keyed on email with a user-id fallback for old rows

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::constants::{PROFILES_TABLE, PROFILE_EMAIL_COLUMN, PROFILE_USER_ID_COLUMN};
use crate::error::{CoreError, CoreResult};
use crate::models::{ProfileUpdate, UserProfile};
use crate::services::identity::{Identifier, Session};
use crate::store::{Filter, OnConflict, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKey<'a> {
    Email(&'a str),
    UserId(&'a str),
}

/// Unsaved profile shown before the viewer edits anything
pub fn default_profile(session: &Session) -> UserProfile {
    UserProfile {
        user_id: session.user_id.clone().unwrap_or_default(),
        email: session.email.clone(),
        display_name: session.name.clone(),
        avatar_url: session.image.clone(),
        ..Default::default()
    }
}

pub struct ProfileService {
    store: Arc<dyn RecordStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Email lookups fall back to treating the value as a user id
    pub async fn get_profile(&self, key: ProfileKey<'_>) -> Option<UserProfile> {
        let raw = match key {
            ProfileKey::Email(v) | ProfileKey::UserId(v) => v.trim(),
        };
        if raw.is_empty() {
            return None;
        }

        if let ProfileKey::Email(email) = key {
            if let Some(profile) = self.lookup(PROFILE_EMAIL_COLUMN, email.trim()).await {
                return Some(profile);
            }
        }
        self.lookup(PROFILE_USER_ID_COLUMN, raw).await
    }

    /// The profile page read path: stored profile, or a default built from the session
    pub async fn load_or_default(&self, session: &Session) -> CoreResult<UserProfile> {
        let email = session
            .email
            .as_deref()
            .ok_or_else(|| CoreError::Validation("session has no email".to_string()))?;

        Ok(self
            .get_profile(ProfileKey::Email(email))
            .await
            .unwrap_or_else(|| default_profile(session)))
    }

    /// Create or update the profile for `email`; the email is the conflict key
    pub async fn upsert_profile(
        &self,
        email: Option<&str>,
        update: &ProfileUpdate,
        user_id: Option<&str>,
    ) -> CoreResult<UserProfile> {
        let email = email
            .ok_or_else(|| CoreError::Validation("email is required to save a profile".to_string()))
            .and_then(Identifier::email)?;

        let mut payload = serde_json::to_value(update)
            .map_err(|e| CoreError::Validation(format!("unserializable profile: {}", e)))?;
        if let Value::Object(fields) = &mut payload {
            fields.insert(PROFILE_EMAIL_COLUMN.to_string(), Value::from(email.as_str()));
            fields.insert("last_updated_at".to_string(), Value::from(Utc::now().to_rfc3339()));
            if let Some(user_id) = user_id {
                fields.insert(PROFILE_USER_ID_COLUMN.to_string(), Value::from(user_id));
            }
        }

        let row = self
            .store
            .upsert(PROFILES_TABLE, payload, PROFILE_EMAIL_COLUMN, OnConflict::Merge)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("profile for {} not returned", email)))?;

        log::info!("[Profiles] Saved profile for {}", email);
        serde_json::from_value(row)
            .map_err(|e| CoreError::Persistence(format!("unreadable profile row: {}", e)))
    }

    async fn lookup(&self, column: &str, value: &str) -> Option<UserProfile> {
        match self.store.get(PROFILES_TABLE, &Filter::eq(column, value)).await {
            Ok(Some(row)) => serde_json::from_value(row)
                .map_err(|e| log::warn!("[Profiles] Unreadable profile row: {}", e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                log::error!("[Profiles] Failed to fetch profile by {}: {}", column, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn email_lookup_falls_back_to_user_id() {
        let store = MemoryStore::new();
        store.insert(
            PROFILES_TABLE,
            json!({"user_id": "legacy-1", "email": null, "display_name": "Old Row"}),
        );
        let service = ProfileService::new(Arc::new(store));

        let found = service.get_profile(ProfileKey::Email("legacy-1")).await.unwrap();
        assert_eq!(found.display_name.as_deref(), Some("Old Row"));
        assert!(service.get_profile(ProfileKey::Email("")).await.is_none());
    }

    #[tokio::test]
    async fn upsert_keys_on_email_and_merges() {
        let store = Arc::new(MemoryStore::new());
        let service = ProfileService::new(store.clone());

        let first = ProfileUpdate {
            display_name: Some("Ada".into()),
            ..Default::default()
        };
        service
            .upsert_profile(Some("ada@example.com"), &first, Some("session-1"))
            .await
            .unwrap();

        let second = ProfileUpdate {
            bio: Some("draws cats".into()),
            social_links: Some(vec!["https://x.com/ada".into()]),
            ..Default::default()
        };
        let saved = service
            .upsert_profile(Some("ada@example.com"), &second, Some("session-2"))
            .await
            .unwrap();

        assert_eq!(store.rows(PROFILES_TABLE).len(), 1);
        assert_eq!(saved.display_name.as_deref(), Some("Ada"));
        assert_eq!(saved.bio.as_deref(), Some("draws cats"));
        assert_eq!(saved.user_id, "session-2");
        assert_eq!(saved.social_links, vec!["https://x.com/ada"]);
        assert!(saved.last_updated_at.is_some());
    }

    #[tokio::test]
    async fn upsert_requires_email_and_reports_outage() {
        let store = Arc::new(MemoryStore::new());
        let service = ProfileService::new(store.clone());
        let update = ProfileUpdate::default();

        assert!(matches!(
            service.upsert_profile(None, &update, None).await,
            Err(CoreError::Validation(_))
        ));

        store.set_offline(true);
        assert!(matches!(
            service.upsert_profile(Some("ada@example.com"), &update, None).await,
            Err(CoreError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn load_or_default_builds_from_session() {
        let service = ProfileService::new(Arc::new(MemoryStore::new()));
        let session = Session {
            user_id: Some("abc".into()),
            email: Some("new@example.com".into()),
            name: Some("Newcomer".into()),
            image: Some("https://img/new.png".into()),
        };

        let profile = service.load_or_default(&session).await.unwrap();
        assert_eq!(profile, default_profile(&session));
        assert_eq!(profile.display_name.as_deref(), Some("Newcomer"));
        assert!(profile.social_links.is_empty());
    }
}
