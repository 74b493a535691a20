//! Composition root.
//!
//! Constructs the session manager and project cache over shared record
//! store / change feed handles once per process, wires identity changes
//! into project load triggers, and exposes a single read-only snapshot
//! plus non-throwing mutation commands to presentation code. No ambient
//! globals: consumers hold an `Arc<Dashboard>`.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use sitedesk_core::config::SyncConfig;
use sitedesk_core::feed::ChangeFeed;
use sitedesk_core::project::FinancialRecordDraft;
use sitedesk_core::session::AuthEvent;
use sitedesk_core::store::RecordStore;

use crate::project::ProjectService;
use crate::session::SessionService;
use crate::snapshot::{DashboardSnapshot, SnapshotStore};

/// Facade over the sync core.
///
/// Every command resolves without returning an error; failures surface
/// through the snapshot's `error` field.
pub struct Dashboard {
    session: Arc<SessionService>,
    projects: Arc<ProjectService>,
    snapshot: Arc<SnapshotStore>,
    feed: Arc<dyn ChangeFeed>,
    auth_pump: Mutex<Option<JoinHandle<()>>>,
}

impl Dashboard {
    pub fn new(
        store: Arc<dyn RecordStore>,
        feed: Arc<dyn ChangeFeed>,
        config: SyncConfig,
    ) -> Arc<Self> {
        let snapshot = Arc::new(SnapshotStore::new());
        let session = Arc::new(SessionService::new(
            store.clone(),
            snapshot.clone(),
            config.clone(),
        ));
        let projects = Arc::new(ProjectService::new(
            store,
            feed.clone(),
            snapshot.clone(),
            config,
        ));
        Arc::new(Self {
            session,
            projects,
            snapshot,
            feed,
            auth_pump: Mutex::new(None),
        })
    }

    /// Starts the sync core: opens the session-notification stream,
    /// bootstraps the session, and loads the project set if a live
    /// session was found.
    pub async fn bootstrap(self: &Arc<Self>) {
        self.start_auth_pump().await;
        if self.session.bootstrap().await {
            self.projects.load_projects().await;
        }
    }

    /// Returns the current snapshot. Synchronous and read-only.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot.get()
    }

    /// Opens a watch on snapshot publications.
    pub fn watch(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot.watch()
    }

    /// Switches the current project.
    pub async fn select_project(&self, project_id: &str) {
        self.projects.select_project(project_id).await;
    }

    /// Re-fetches the accessible project set.
    pub async fn refresh_projects(&self) {
        self.projects.refresh().await;
    }

    /// Creates a financial record against a project.
    pub async fn add_financial_record(&self, draft: FinancialRecordDraft) {
        self.projects.add_financial_record(draft).await;
    }

    /// Signs out and evicts the project working set.
    ///
    /// The snapshot reflects the signed-out state before the backend
    /// invalidation round trip completes.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        self.projects.clear().await;
    }

    /// Bridges session-changed notifications into the session manager.
    ///
    /// An external sign-in (re)loads the project set; an external
    /// sign-out evicts it, mirroring the local command paths.
    async fn start_auth_pump(self: &Arc<Self>) {
        let subscription = match self.feed.subscribe_session().await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!("[Dashboard] Session notification subscribe failed: {}", e);
                return;
            }
        };

        let dashboard = Arc::clone(self);
        let pump = tokio::spawn(async move {
            let mut events = subscription.events;
            while let Some(event) = events.recv().await {
                let reload = matches!(event, AuthEvent::SignedIn { .. });
                let evict = matches!(event, AuthEvent::SignedOut);
                dashboard.session.handle_auth_event(event);
                if reload {
                    dashboard.projects.load_projects().await;
                } else if evict {
                    dashboard.projects.clear().await;
                }
            }
            tracing::debug!("[Dashboard] Auth pump stopped");
        });

        let mut auth_pump = self.auth_pump.lock().await;
        if let Some(previous) = auth_pump.replace(pump) {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
    use sitedesk_core::project::{
        FinancialCategory, FinancialRecord, FinancialStatus, Milestone, MilestoneStatus, Project,
        ProjectStatus,
    };
    use sitedesk_core::session::{AuthState, Session, SessionMetadata};
    use sitedesk_infrastructure::{Hold, MemoryChangeFeed, MemoryRecordStore};
    use std::time::Duration;

    fn session(user_id: &str) -> Session {
        Session {
            access_token: format!("token-{user_id}"),
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            expires_at: None,
            metadata: SessionMetadata::default(),
        }
    }

    fn project(id: &str, age_hours: i64, total_budget: Option<f64>) -> Project {
        Project {
            id: id.to_string(),
            company_id: "c-1".to_string(),
            homeowner_id: "u-1".to_string(),
            project_manager_id: None,
            name: format!("Project {id}"),
            address: None,
            status: ProjectStatus::InProgress,
            start_date: None,
            estimated_completion: None,
            actual_completion: None,
            total_budget,
            current_spent: 0.0,
            created_at: Utc::now() - ChronoDuration::hours(age_hours),
        }
    }

    fn milestone(id: &str, project_id: &str, day: u32) -> Milestone {
        Milestone {
            id: id.to_string(),
            project_id: project_id.to_string(),
            phase_id: None,
            title: format!("Milestone {id}"),
            status: MilestoneStatus::Pending,
            scheduled_start: NaiveDate::from_ymd_opt(2025, 7, day),
            scheduled_end: None,
            progress_percentage: 0,
            created_at: Utc::now(),
        }
    }

    fn record(id: &str, category: FinancialCategory, amount: f64) -> FinancialRecord {
        FinancialRecord {
            id: id.to_string(),
            project_id: "p-a".to_string(),
            category,
            description: format!("Record {id}"),
            amount,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            status: FinancialStatus::Paid,
            created_at: Utc::now(),
        }
    }

    async fn settled<F>(dashboard: &Dashboard, predicate: F) -> DashboardSnapshot
    where
        F: FnMut(&DashboardSnapshot) -> bool,
    {
        let mut rx = dashboard.watch();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
            .await
            .expect("snapshot did not settle in time")
            .expect("snapshot channel closed")
            .clone()
    }

    #[tokio::test]
    async fn test_budget_used_end_to_end() {
        let store = Arc::new(MemoryRecordStore::new());
        let feed = Arc::new(MemoryChangeFeed::new());
        store.set_session(session("u-1")).await;
        store.seed_project(project("p-a", 1, Some(100_000.0))).await;
        store
            .seed_financial_record(record("f-1", FinancialCategory::Payment, 30_000.0))
            .await;
        store
            .seed_financial_record(record("f-2", FinancialCategory::Expense, 12_000.0))
            .await;
        store
            .seed_financial_record(record("f-3", FinancialCategory::BudgetItem, 50_000.0))
            .await;

        let dashboard = Dashboard::new(store, feed, SyncConfig::default());
        dashboard.bootstrap().await;

        let snap = dashboard.snapshot();
        assert_eq!(snap.auth_state, AuthState::Authenticated);
        let stats = snap.stats.unwrap();
        assert_eq!(stats.total_spent, 42_000.0);
        assert_eq!(stats.budget_used, 42);
    }

    #[tokio::test]
    async fn test_switch_before_settle_shows_only_new_project() {
        let store = Arc::new(MemoryRecordStore::new());
        let feed = Arc::new(MemoryChangeFeed::new());
        store.set_session(session("u-1")).await;
        store.seed_project(project("p-a", 1, None)).await;
        store.seed_project(project("p-b", 2, None)).await;
        store.seed_milestone(milestone("m-a", "p-a", 1)).await;
        store.seed_milestone(milestone("m-b", "p-b", 2)).await;

        let dashboard = Dashboard::new(store.clone(), feed, SyncConfig::default());
        dashboard.bootstrap().await;
        assert_eq!(dashboard.snapshot().current_project_id(), Some("p-a"));

        // Park A's milestone refetch, then switch to B before it settles
        let (hold, gate) = Hold::new();
        store.hold_next_milestones(gate);
        let reselecting = {
            let dashboard = dashboard.clone();
            tokio::spawn(async move { dashboard.select_project("p-a").await })
        };
        hold.entered().await;
        dashboard.select_project("p-b").await;
        hold.release();
        reselecting.await.unwrap();

        let snap = dashboard.snapshot();
        assert_eq!(snap.current_project_id(), Some("p-b"));
        assert_eq!(snap.milestones.len(), 1);
        assert_eq!(snap.milestones[0].id, "m-b");
    }

    #[tokio::test]
    async fn test_bootstrap_with_unreachable_store_settles_within_failsafe() {
        let store = Arc::new(MemoryRecordStore::new());
        let feed = Arc::new(MemoryChangeFeed::new());
        let (hold, gate) = Hold::new();
        store.hold_next_session(gate);

        let dashboard = Dashboard::new(
            store,
            feed,
            SyncConfig {
                bootstrap_failsafe_ms: 50,
                ..Default::default()
            },
        );
        dashboard.bootstrap().await;

        let snap = dashboard.snapshot();
        assert_eq!(snap.auth_state, AuthState::Unauthenticated);
        assert!(!snap.loading);

        hold.release();
    }

    #[tokio::test]
    async fn test_sign_out_evicts_working_set() {
        let store = Arc::new(MemoryRecordStore::new());
        let feed = Arc::new(MemoryChangeFeed::new());
        store.set_session(session("u-1")).await;
        store.seed_project(project("p-a", 1, None)).await;

        let dashboard = Dashboard::new(store, feed.clone(), SyncConfig::default());
        dashboard.bootstrap().await;
        assert!(dashboard.snapshot().current_project.is_some());

        dashboard.sign_out().await;

        let snap = dashboard.snapshot();
        assert_eq!(snap.auth_state, AuthState::Unauthenticated);
        assert!(snap.session.is_none());
        assert!(snap.profile.is_none());
        assert!(snap.projects.is_empty());
        assert!(snap.current_project.is_none());
        assert_eq!(feed.active_subscriptions().await, 0);
    }

    #[tokio::test]
    async fn test_external_sign_in_loads_projects() {
        let store = Arc::new(MemoryRecordStore::new());
        let feed = Arc::new(MemoryChangeFeed::new());
        store.seed_project(project("p-a", 1, None)).await;

        let dashboard = Dashboard::new(store, feed.clone(), SyncConfig::default());
        dashboard.bootstrap().await;
        assert_eq!(dashboard.snapshot().auth_state, AuthState::Unauthenticated);

        feed.emit_auth(AuthEvent::SignedIn {
            session: session("u-1"),
        })
        .await;

        let snap = settled(&dashboard, |s| s.current_project.is_some()).await;
        assert_eq!(snap.auth_state, AuthState::Authenticated);
        assert_eq!(snap.current_project_id(), Some("p-a"));
    }

    #[tokio::test]
    async fn test_external_sign_out_evicts_working_set() {
        let store = Arc::new(MemoryRecordStore::new());
        let feed = Arc::new(MemoryChangeFeed::new());
        store.set_session(session("u-1")).await;
        store.seed_project(project("p-a", 1, None)).await;

        let dashboard = Dashboard::new(store, feed.clone(), SyncConfig::default());
        dashboard.bootstrap().await;
        assert!(dashboard.snapshot().current_project.is_some());

        feed.emit_auth(AuthEvent::SignedOut).await;

        let snap = settled(&dashboard, |s| s.projects.is_empty()).await;
        assert_eq!(snap.auth_state, AuthState::Unauthenticated);
        assert!(snap.current_project.is_none());
    }
}
