//! Sync core configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the session and project-state sync layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How long the session bootstrap may stay unresolved before the
    /// auth state is forced out of its loading state (liveness override,
    /// not an error).
    pub bootstrap_failsafe_ms: u64,
    /// Maximum number of financial records kept in the snapshot
    /// (most recent first).
    pub financial_record_cap: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bootstrap_failsafe_ms: 3_000,
            financial_record_cap: 50,
        }
    }
}

impl SyncConfig {
    pub fn bootstrap_failsafe(&self) -> Duration {
        Duration::from_millis(self.bootstrap_failsafe_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.bootstrap_failsafe(), Duration::from_secs(3));
        assert_eq!(config.financial_record_cap, 50);
    }
}
