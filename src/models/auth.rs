//! Session and user documents exchanged with the identity backend
//!
//! These mirror the GoTrue JSON shapes closely enough to round-trip through
//! the session cookie, while ignoring fields this service never reads.

use actix_web::cookie::Cookie;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session issued by the identity backend
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix timestamp; computed from `expires_in` when the backend omits it
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AuthSession {
    /// Fill in `expires_at` relative to `now` if the backend left it out
    #[must_use]
    pub fn with_expiry_from(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(now.timestamp() + self.expires_in);
        }
        self
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now.timestamp())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// Display name from `user_metadata.name`, if set
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata
            .get("name")
            .and_then(serde_json::Value::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// Profile fields shown on the settings page
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<AuthUser> for UserProfile {
    fn from(user: AuthUser) -> Self {
        let name = user.display_name().map(ToString::to_string);
        Self {
            id: user.id,
            email: user.email,
            name,
            created_at: user.created_at,
        }
    }
}

/// An established session together with the cookies that persist it.
///
/// The caller owns propagating `cookies` onto its own response; nothing else
/// carries the session across the redirect. `session` is `None` when the
/// backend accepted a credential without starting a session, as it does for
/// the first half of a two-address email change.
#[derive(Debug, Clone, Default)]
pub struct SessionGrant {
    pub session: Option<AuthSession>,
    pub cookies: Vec<Cookie<'static>>,
}

impl SessionGrant {
    #[must_use]
    pub fn new(session: AuthSession, cookies: Vec<Cookie<'static>>) -> Self {
        Self {
            session: Some(session),
            cookies,
        }
    }

    /// Accepted without a session
    #[must_use]
    pub fn without_session() -> Self {
        Self::default()
    }
}

/// Result of one credential exchange attempt
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    Verified(SessionGrant),
    Rejected(String),
}

impl VerificationOutcome {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    #[must_use]
    pub fn into_grant(self) -> Option<SessionGrant> {
        match self {
            Self::Verified(grant) => Some(grant),
            Self::Rejected(_) => None,
        }
    }
}
