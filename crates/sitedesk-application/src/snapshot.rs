//! The atomically replaceable view exposed to presentation code.
//!
//! The snapshot is the only mutable resource shared between the session
//! manager and the project cache. It is replaced wholesale through a
//! watch channel, so a reader observes either the fully-old or the
//! fully-new value, never a mix. Stats are recomputed inside every
//! update; no mutation path can publish stale stats.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use sitedesk_core::project::{FinancialRecord, Milestone, Project};
use sitedesk_core::session::{AuthState, Session};
use sitedesk_core::stats::{self, ProjectStats};
use sitedesk_core::user::Profile;

/// Complete read-only view of session and project state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub auth_state: AuthState,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    /// All projects accessible to the current identity, newest first
    pub projects: Vec<Project>,
    pub current_project: Option<Project>,
    /// Milestones of the current project, scheduled start ascending
    pub milestones: Vec<Milestone>,
    /// Financial records of the current project, date descending, capped
    pub financial_records: Vec<FinancialRecord>,
    /// Derived metrics; `None` when no project is selected
    pub stats: Option<ProjectStats>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            auth_state: AuthState::Unknown,
            session: None,
            profile: None,
            projects: Vec::new(),
            current_project: None,
            milestones: Vec::new(),
            financial_records: Vec::new(),
            stats: None,
            // The UI starts in a loading state until bootstrap settles
            loading: true,
            error: None,
        }
    }
}

impl DashboardSnapshot {
    /// Identifier of the currently selected project, if any.
    pub fn current_project_id(&self) -> Option<&str> {
        self.current_project.as_ref().map(|p| p.id.as_str())
    }
}

/// Owner of the shared snapshot.
///
/// Mutations run inside the watch channel's modify closure, which
/// serializes them and republishes the whole value. Reads are
/// synchronous clones of the latest published value.
pub struct SnapshotStore {
    tx: watch::Sender<DashboardSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DashboardSnapshot::default());
        Self { tx }
    }

    /// Applies a mutation, recomputes stats, and publishes the result.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut DashboardSnapshot),
    {
        self.tx.send_modify(|snapshot| {
            f(snapshot);
            Self::recompute_stats(snapshot);
        });
    }

    /// Applies a conditional mutation.
    ///
    /// The closure returns false to leave the snapshot untouched (used
    /// by supersession checks: the decision and the write happen under
    /// the same serialization, so no newer selection can slip between
    /// them). Returns whether the mutation was applied.
    pub fn update_if<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut DashboardSnapshot) -> bool,
    {
        let mut applied = false;
        self.tx.send_if_modified(|snapshot| {
            if f(snapshot) {
                Self::recompute_stats(snapshot);
                applied = true;
                true
            } else {
                false
            }
        });
        applied
    }

    /// Returns the latest published snapshot.
    pub fn get(&self) -> DashboardSnapshot {
        self.tx.borrow().clone()
    }

    /// Opens a watch on snapshot publications.
    pub fn watch(&self) -> watch::Receiver<DashboardSnapshot> {
        self.tx.subscribe()
    }

    fn recompute_stats(snapshot: &mut DashboardSnapshot) {
        snapshot.stats = snapshot.current_project.as_ref().map(|project| {
            stats::compute(
                project,
                &snapshot.milestones,
                &snapshot.financial_records,
                Utc::now().date_naive(),
            )
        });
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sitedesk_core::project::ProjectStatus;

    fn project(id: &str, total_budget: Option<f64>) -> Project {
        Project {
            id: id.to_string(),
            company_id: "c-1".to_string(),
            homeowner_id: "u-1".to_string(),
            project_manager_id: None,
            name: format!("Project {id}"),
            address: None,
            status: ProjectStatus::Planning,
            start_date: None,
            estimated_completion: None,
            actual_completion: None,
            total_budget,
            current_spent: 0.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_update_publishes_to_watchers() {
        let store = SnapshotStore::new();
        let rx = store.watch();

        store.update(|s| s.loading = false);

        assert!(!rx.borrow().loading);
        assert!(!store.get().loading);
    }

    #[test]
    fn test_stats_follow_current_project() {
        let store = SnapshotStore::new();
        assert!(store.get().stats.is_none());

        store.update(|s| s.current_project = Some(project("p-1", Some(1000.0))));
        let stats = store.get().stats.unwrap();
        assert_eq!(stats.total_budget, 1000.0);

        store.update(|s| s.current_project = None);
        assert!(store.get().stats.is_none());
    }

    #[test]
    fn test_update_if_rejection_leaves_snapshot_unchanged() {
        let store = SnapshotStore::new();
        store.update(|s| s.current_project = Some(project("p-1", None)));

        let applied = store.update_if(|s| {
            if s.current_project_id() == Some("p-2") {
                s.error = Some("should not happen".to_string());
                true
            } else {
                false
            }
        });

        assert!(!applied);
        assert!(store.get().error.is_none());
    }
}
