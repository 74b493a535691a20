//! Authentication lifecycle states.

use serde::{Deserialize, Serialize};

/// State machine for the authentication lifecycle.
///
/// Transitions:
/// `Unknown -> Authenticating -> Authenticated -> SigningOut -> Unauthenticated`.
/// `Unknown` is the initial state at process start; a bounded failsafe
/// timer guarantees the machine leaves `Unknown`/`Authenticating` even if
/// the session query never resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// Process start; no session query has resolved yet.
    #[default]
    Unknown,
    /// A session query is in flight.
    Authenticating,
    /// A live session is held.
    Authenticated,
    /// Local state cleared, backend invalidation in flight.
    SigningOut,
    /// No session.
    Unauthenticated,
}

impl AuthState {
    /// Returns true once the machine has reached a terminal answer for
    /// "is anyone signed in" (either direction).
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Unauthenticated)
    }
}
