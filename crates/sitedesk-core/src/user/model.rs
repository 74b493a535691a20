//! Profile domain model.
//!
//! A `Profile` carries the denormalized user attributes shown in the
//! dashboard header and role-gated views. Two sources may populate it:
//! the record store (authoritative) or session metadata (provisional).
//! The provenance flag lets callers decide whether role-gated fields can
//! be trusted yet.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::session::Session;

/// Role of a user within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    #[default]
    Homeowner,
    Builder,
    ProjectManager,
    Subcontractor,
    Admin,
}

/// Where a profile's field values came from.
///
/// A provisional profile is synthesized from session metadata so the UI
/// has something to render while the store query is in flight. It is
/// silently replaced by the authoritative row when that query resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    /// Loaded from the persistent store.
    Authoritative,
    /// Synthesized from session metadata.
    Provisional,
}

/// Denormalized user attributes, 1:1 with a session's user identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// User identifier (matches the session's user id)
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    /// Weak reference to the user's company, if any
    pub company_id: Option<String>,
    /// Provenance of this profile's values
    pub source: ProfileSource,
}

impl Profile {
    /// Synthesizes a provisional profile from session metadata.
    ///
    /// Used when the authoritative store row has not loaded yet. Missing
    /// metadata falls back to a generic display name and the homeowner
    /// role, so role-gated fields must not be trusted until the source
    /// is `Authoritative`.
    pub fn provisional_from_session(session: &Session) -> Self {
        let metadata = &session.metadata;
        Self {
            id: session.user_id.clone(),
            email: session.email.clone(),
            first_name: metadata
                .first_name
                .clone()
                .unwrap_or_else(|| "User".to_string()),
            last_name: metadata.last_name.clone().unwrap_or_default(),
            role: metadata.role.unwrap_or_default(),
            company_id: None,
            source: ProfileSource::Provisional,
        }
    }

    /// Returns true if this profile was loaded from the persistent store.
    pub fn is_authoritative(&self) -> bool {
        self.source == ProfileSource::Authoritative
    }

    /// Full display name ("First Last", trimmed when the last name is empty).
    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}
