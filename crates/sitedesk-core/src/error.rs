//! Error types for the Sitedesk sync core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire sync core.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
///
/// The taxonomy is deliberately small:
/// - `Transient`: a query or subscription failed; the last-known-good
///   snapshot is usually retained.
/// - `AuthInvalid`: the session was rejected; callers must fall back to
///   the unauthenticated state.
/// - `Superseded`: a stale asynchronous result was discarded because a
///   newer request replaced it. Never surfaced to presentation code.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum SitedeskError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Transient I/O error (store query, feed subscribe)
    #[error("Transient error: {0}")]
    Transient(String),

    /// Session rejected or expired
    #[error("Auth invalid: {0}")]
    AuthInvalid(String),

    /// Stale result discarded in favor of a newer one
    #[error("Superseded: {resource}")]
    Superseded { resource: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SitedeskError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// Creates an AuthInvalid error
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::AuthInvalid(message.into())
    }

    /// Creates a Superseded error
    pub fn superseded(resource: impl Into<String>) -> Self {
        Self::Superseded {
            resource: resource.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a Transient error
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Check if this is an AuthInvalid error
    pub fn is_auth_invalid(&self) -> bool {
        matches!(self, Self::AuthInvalid(_))
    }

    /// Check if this is a Superseded error.
    ///
    /// Superseded results are part of normal operation and must never be
    /// written into the snapshot's error field.
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

impl From<std::io::Error> for SitedeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Transient(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for SitedeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (transitional, should be removed eventually)
impl From<anyhow::Error> for SitedeskError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, SitedeskError>`.
pub type Result<T> = std::result::Result<T, SitedeskError>;
