//! Backend configuration loaded from the environment (and an optional `.env` file)

use std::{env, path::PathBuf, time::Duration};

use crate::constants::{APP_DATA_DIR, DEFAULT_STUDIO_CONTACT, DEFAULT_TIMEOUT_SECS, LIKED_DB_FILE};
use crate::error::{CoreError, CoreResult};

pub const BACKEND_URL_VAR: &str = "STICKERDROP_BACKEND_URL";
pub const ANON_KEY_VAR: &str = "STICKERDROP_ANON_KEY";
pub const TIMEOUT_VAR: &str = "STICKERDROP_TIMEOUT_SECS";
pub const LIKED_DB_VAR: &str = "STICKERDROP_LIKED_DB";
pub const CHECKOUT_URL_VAR: &str = "STICKERDROP_CHECKOUT_URL";
pub const STUDIO_CONTACT_VAR: &str = "STICKERDROP_STUDIO_CONTACT";

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout: Duration,
    pub liked_db_path: PathBuf,
    pub checkout_url: Option<String>,
    pub studio_contact: String,
}

impl BackendConfig {
    /// Build a config by hand (tests, embedding)
    pub fn new(url: &str, anon_key: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            liked_db_path: default_liked_db_path(),
            checkout_url: None,
            studio_contact: DEFAULT_STUDIO_CONTACT.to_string(),
        }
    }

    /// Load `.env` if present, then read configuration from environment variables
    pub fn from_env() -> CoreResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("[Config] No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = required(&lookup, BACKEND_URL_VAR)?;
        let anon_key = required(&lookup, ANON_KEY_VAR)?;
        let mut config = Self::new(&url, &anon_key);

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|e| CoreError::Config(format!("Invalid {}: {}", TIMEOUT_VAR, e)))?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(path) = lookup(LIKED_DB_VAR).filter(|p| !p.trim().is_empty()) {
            config.liked_db_path = PathBuf::from(path);
        }

        config.checkout_url = lookup(CHECKOUT_URL_VAR).filter(|u| !u.trim().is_empty());

        if let Some(contact) = lookup(STUDIO_CONTACT_VAR).filter(|c| !c.trim().is_empty()) {
            config.studio_contact = contact;
        }

        log::info!("[Config] Backend: {} (timeout {}s)", config.url, config.timeout.as_secs());
        Ok(config)
    }
}

fn required<F>(lookup: &F, key: &str) -> CoreResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::Config(format!("{} must be set", key)))
}

fn default_liked_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DATA_DIR)
        .join(LIKED_DB_FILE)
}
