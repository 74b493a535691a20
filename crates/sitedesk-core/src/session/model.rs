//! Session domain model.
//!
//! This module contains the core Session entity that represents an
//! authenticated identity in the application's domain layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserRole;

/// Represents the live authentication session for this process.
///
/// At most one session is live at a time. It is created on successful
/// credential exchange or token refresh and destroyed on sign-out or
/// expiry. This is the "pure" domain model that business logic operates
/// on, independent of the hosted auth platform's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identity token issued by the auth backend
    pub access_token: String,
    /// Identifier of the authenticated user
    pub user_id: String,
    /// Email the user authenticated with
    pub email: String,
    /// Token expiry, if the backend communicated one
    pub expires_at: Option<DateTime<Utc>>,
    /// Name/role hints captured at authentication time
    #[serde(default)]
    pub metadata: SessionMetadata,
}

/// User attributes carried alongside the token at authentication time.
///
/// These are hints only; the authoritative values live in the record
/// store. They exist so a provisional profile can be synthesized before
/// the store query resolves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl Session {
    /// Returns true if the session has an expiry in the past.
    ///
    /// A session without an expiry is treated as live; the backend is
    /// the authority on revocation in that case.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: Option<DateTime<Utc>>) -> Session {
        Session {
            access_token: "token".to_string(),
            user_id: "user-1".to_string(),
            email: "user@example.com".to_string(),
            expires_at,
            metadata: SessionMetadata::default(),
        }
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        assert!(!session(None).is_expired(now));
        assert!(!session(Some(now + Duration::hours(1))).is_expired(now));
        assert!(session(Some(now - Duration::seconds(1))).is_expired(now));
    }
}
