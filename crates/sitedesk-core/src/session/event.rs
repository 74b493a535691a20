use serde::{Deserialize, Serialize};

use super::model::Session;

/// Session-changed notifications pushed by the change feed.
///
/// These arrive independently of any in-flight session query (e.g. a
/// token refresh, or a sign-out performed in another tab). The payload
/// carries the full session so receivers can re-derive local state
/// without a round trip to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// Credentials were exchanged for a new session.
    SignedIn { session: Session },
    /// The backend refreshed the session's token.
    TokenRefreshed { session: Session },
    /// The session was invalidated.
    SignedOut,
}

impl AuthEvent {
    /// Returns the session carried by this event, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::SignedIn { session } | Self::TokenRefreshed { session } => Some(session),
            Self::SignedOut => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_out_serializes_with_tag() {
        let json = serde_json::to_value(&AuthEvent::SignedOut).unwrap();
        assert_eq!(json["type"], "signed_out");
    }
}
