//! Identifier resolution
//!
//! Subscriptions and profiles are keyed on the account email. The session's
//! user id rotates across logins for the same account, so it is never used as
//! the subscription key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The signed-in viewer, passed explicitly into every operation that needs it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl Session {
    pub fn with_email(email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            ..Default::default()
        }
    }
}

/// A validated, stable record key (account email)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn email(raw: &str) -> CoreResult<Self> {
        let email = raw.trim();
        if email.is_empty() {
            return Err(CoreError::Validation("email is empty".to_string()));
        }

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
                Ok(Identifier(email.to_string()))
            }
            _ => Err(CoreError::Validation(format!("'{}' is not an email address", email))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the stable identifier for a session; fails fast when the email is absent
pub fn resolve_identifier(session: &Session) -> CoreResult<Identifier> {
    match session.email.as_deref() {
        Some(email) => Identifier::email(email),
        None => Err(CoreError::Validation("session has no email".to_string())),
    }
}
