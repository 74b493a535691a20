//! In-memory record store.
//!
//! Process-local implementation of the [`RecordStore`] contract. Backs
//! the application tests and any offline/demo composition. Failure
//! injection and hold gates exist so the sync layer's race handling can
//! be exercised deterministically.

use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use sitedesk_core::error::{Result, SitedeskError};
use sitedesk_core::project::{FinancialRecord, FinancialRecordDraft, Milestone, Project};
use sitedesk_core::session::Session;
use sitedesk_core::store::RecordStore;
use sitedesk_core::user::Profile;

use crate::hold::HoldGate;

#[derive(Default)]
struct Tables {
    session: Option<Session>,
    profiles: Vec<Profile>,
    projects: Vec<Project>,
    milestones: Vec<Milestone>,
    financial_records: Vec<FinancialRecord>,
}

/// One-shot failure flags, consumed by the next matching call.
#[derive(Default)]
struct Flags {
    fail_session: bool,
    fail_invalidate: bool,
    fail_profile: bool,
    fail_projects: bool,
    fail_milestones: bool,
    fail_financials: bool,
    fail_insert: bool,
}

/// One-shot hold gates, consumed by the next matching call.
#[derive(Default)]
struct Gates {
    session: Option<HoldGate>,
    profile: Option<HoldGate>,
    milestones: Option<HoldGate>,
}

/// In-memory [`RecordStore`] with seedable tables.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: RwLock<Tables>,
    flags: StdMutex<Flags>,
    gates: StdMutex<Gates>,
    invalidate_calls: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    pub async fn set_session(&self, session: Session) {
        self.tables.write().await.session = Some(session);
    }

    pub async fn seed_profile(&self, profile: Profile) {
        self.tables.write().await.profiles.push(profile);
    }

    pub async fn seed_project(&self, project: Project) {
        self.tables.write().await.projects.push(project);
    }

    pub async fn seed_milestone(&self, milestone: Milestone) {
        self.tables.write().await.milestones.push(milestone);
    }

    pub async fn remove_project(&self, project_id: &str) {
        self.tables
            .write()
            .await
            .projects
            .retain(|p| p.id != project_id);
    }

    pub async fn seed_financial_record(&self, record: FinancialRecord) {
        self.tables.write().await.financial_records.push(record);
    }

    // ------------------------------------------------------------------
    // Failure injection (one-shot)
    // ------------------------------------------------------------------

    pub fn fail_next_session(&self) {
        self.flags.lock().unwrap().fail_session = true;
    }

    pub fn fail_next_invalidate(&self) {
        self.flags.lock().unwrap().fail_invalidate = true;
    }

    pub fn fail_next_profile(&self) {
        self.flags.lock().unwrap().fail_profile = true;
    }

    pub fn fail_next_projects(&self) {
        self.flags.lock().unwrap().fail_projects = true;
    }

    pub fn fail_next_milestones(&self) {
        self.flags.lock().unwrap().fail_milestones = true;
    }

    pub fn fail_next_financials(&self) {
        self.flags.lock().unwrap().fail_financials = true;
    }

    pub fn fail_next_insert(&self) {
        self.flags.lock().unwrap().fail_insert = true;
    }

    // ------------------------------------------------------------------
    // Hold gates (one-shot)
    // ------------------------------------------------------------------

    pub fn hold_next_session(&self, gate: HoldGate) {
        self.gates.lock().unwrap().session = Some(gate);
    }

    pub fn hold_next_profile(&self, gate: HoldGate) {
        self.gates.lock().unwrap().profile = Some(gate);
    }

    pub fn hold_next_milestones(&self, gate: HoldGate) {
        self.gates.lock().unwrap().milestones = Some(gate);
    }

    /// Number of times backend invalidation was requested.
    pub fn invalidate_call_count(&self) -> usize {
        self.invalidate_calls.load(Ordering::SeqCst)
    }

    fn take_flag(&self, pick: impl FnOnce(&mut Flags) -> &mut bool) -> bool {
        let mut flags = self.flags.lock().unwrap();
        std::mem::take(pick(&mut flags))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_session(&self) -> Result<Option<Session>> {
        let gate = self.gates.lock().unwrap().session.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.take_flag(|f| &mut f.fail_session) {
            return Err(SitedeskError::transient("session endpoint unreachable"));
        }
        Ok(self.tables.read().await.session.clone())
    }

    async fn invalidate_session(&self) -> Result<()> {
        self.invalidate_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_flag(|f| &mut f.fail_invalidate) {
            return Err(SitedeskError::transient("invalidation request failed"));
        }
        self.tables.write().await.session = None;
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let gate = self.gates.lock().unwrap().profile.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.take_flag(|f| &mut f.fail_profile) {
            return Err(SitedeskError::transient("profile query failed"));
        }
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        if self.take_flag(|f| &mut f.fail_projects) {
            return Err(SitedeskError::transient("project query failed"));
        }
        let mut projects = self.tables.read().await.projects.clone();
        // Store default ordering: most recently created first
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn list_milestones(&self, project_id: &str) -> Result<Vec<Milestone>> {
        let gate = self.gates.lock().unwrap().milestones.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.take_flag(|f| &mut f.fail_milestones) {
            return Err(SitedeskError::transient("milestone query failed"));
        }
        let tables = self.tables.read().await;
        let mut milestones: Vec<Milestone> = tables
            .milestones
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();
        // Scheduled start ascending, NULLs last (store default ordering)
        milestones.sort_by_key(|m| (m.scheduled_start.is_none(), m.scheduled_start));
        Ok(milestones)
    }

    async fn list_financial_records(&self, project_id: &str) -> Result<Vec<FinancialRecord>> {
        if self.take_flag(|f| &mut f.fail_financials) {
            return Err(SitedeskError::transient("financial record query failed"));
        }
        let tables = self.tables.read().await;
        let mut records: Vec<FinancialRecord> = tables
            .financial_records
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    async fn insert_financial_record(
        &self,
        draft: FinancialRecordDraft,
    ) -> Result<FinancialRecord> {
        if self.take_flag(|f| &mut f.fail_insert) {
            return Err(SitedeskError::transient("financial record insert failed"));
        }
        let record = FinancialRecord {
            id: Uuid::new_v4().to_string(),
            project_id: draft.project_id,
            category: draft.category,
            description: draft.description,
            amount: draft.amount,
            date: draft.date,
            status: draft.status,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .financial_records
            .push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use sitedesk_core::project::{FinancialCategory, FinancialStatus, MilestoneStatus, ProjectStatus};

    fn project(id: &str, age_hours: i64) -> Project {
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
            total_budget: None,
            current_spent: 0.0,
            created_at: Utc::now() - Duration::hours(age_hours),
        }
    }

    fn milestone(id: &str, project_id: &str, start: Option<NaiveDate>) -> Milestone {
        Milestone {
            id: id.to_string(),
            project_id: project_id.to_string(),
            phase_id: None,
            title: format!("Milestone {id}"),
            status: MilestoneStatus::Pending,
            scheduled_start: start,
            scheduled_end: None,
            progress_percentage: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_projects_newest_first() {
        let store = MemoryRecordStore::new();
        store.seed_project(project("old", 48)).await;
        store.seed_project(project("new", 1)).await;

        let projects = store.list_projects().await.unwrap();
        assert_eq!(projects[0].id, "new");
        assert_eq!(projects[1].id, "old");
    }

    #[tokio::test]
    async fn test_list_milestones_filters_and_orders() {
        let store = MemoryRecordStore::new();
        let d = |day| NaiveDate::from_ymd_opt(2025, 7, day);
        store.seed_milestone(milestone("m-2", "p-1", d(20))).await;
        store.seed_milestone(milestone("m-undated", "p-1", None)).await;
        store.seed_milestone(milestone("m-1", "p-1", d(5))).await;
        store.seed_milestone(milestone("m-3", "p-2", d(1))).await;

        let milestones = store.list_milestones("p-1").await.unwrap();
        assert_eq!(milestones.len(), 3);
        assert_eq!(milestones[0].id, "m-1");
        assert_eq!(milestones[1].id, "m-2");
        // Undated milestones sort after dated ones
        assert_eq!(milestones[2].id, "m-undated");
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let store = MemoryRecordStore::new();
        store.fail_next_projects();
        assert!(store.list_projects().await.is_err());
        assert!(store.list_projects().await.is_ok());
    }

    #[tokio::test]
    async fn test_insert_financial_record_assigns_id() {
        let store = MemoryRecordStore::new();
        let record = store
            .insert_financial_record(FinancialRecordDraft {
                project_id: "p-1".to_string(),
                category: FinancialCategory::Expense,
                description: "Lumber".to_string(),
                amount: 1200.0,
                date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                status: FinancialStatus::Pending,
            })
            .await
            .unwrap();

        assert!(!record.id.is_empty());
        let listed = store.list_financial_records("p-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, record.id);
    }

    #[tokio::test]
    async fn test_invalidate_clears_session_and_counts() {
        let store = MemoryRecordStore::new();
        store
            .set_session(Session {
                access_token: "t".to_string(),
                user_id: "u-1".to_string(),
                email: "u@example.com".to_string(),
                expires_at: None,
                metadata: Default::default(),
            })
            .await;

        store.invalidate_session().await.unwrap();
        assert_eq!(store.invalidate_call_count(), 1);
        assert!(store.get_session().await.unwrap().is_none());
    }
}
