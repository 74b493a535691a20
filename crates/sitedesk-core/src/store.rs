//! Record store contract.
//!
//! Defines the interface to the hosted persistence platform. The sync
//! core only ever talks to the backend through this trait, decoupling it
//! from the concrete transport (hosted database API, in-memory double).

use async_trait::async_trait;

use crate::error::Result;
use crate::project::{FinancialRecord, FinancialRecordDraft, Milestone, Project};
use crate::session::Session;
use crate::user::Profile;

/// Typed query/mutate operations against persistent entities.
///
/// # Implementation Notes
///
/// Implementations own ordering:
/// - `list_projects` returns most-recently-created first
/// - `list_milestones` returns scheduled start ascending, undated last
/// - `list_financial_records` returns record date descending
///
/// The cache re-applies these orderings defensively but relies on the
/// store for the default project selection ("first entry by the store's
/// default ordering").
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns the current session, if one is live.
    ///
    /// `Ok(None)` means "definitely signed out"; an `Err` means the
    /// answer is unknown (the store was unreachable).
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Requests backend invalidation of the current session.
    ///
    /// Callers must clear local state before invoking this; sign-out is
    /// never rolled back on failure.
    async fn invalidate_session(&self) -> Result<()>;

    /// Fetches the authoritative profile row for a user.
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Fetches all projects accessible to the current identity.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Fetches all milestones belonging to a project.
    async fn list_milestones(&self, project_id: &str) -> Result<Vec<Milestone>>;

    /// Fetches all financial records belonging to a project.
    async fn list_financial_records(&self, project_id: &str) -> Result<Vec<FinancialRecord>>;

    /// Creates a financial record and returns the stored row.
    async fn insert_financial_record(
        &self,
        draft: FinancialRecordDraft,
    ) -> Result<FinancialRecord>;
}
