//! Project aggregate domain models.
//!
//! `Project` is the root aggregate. Milestones and financial records
//! belong to exactly one project and are loaded/evicted as a unit when
//! the current project changes. Related users and companies are weak
//! references by identifier, never embedded.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Completed,
    OnHold,
}

/// Root aggregate of the dashboard's working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub company_id: String,
    pub homeowner_id: String,
    pub project_manager_id: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub estimated_completion: Option<NaiveDate>,
    pub actual_completion: Option<NaiveDate>,
    /// Total contracted budget; `None` when no budget has been set
    pub total_budget: Option<f64>,
    /// Spend as tracked by the backend (the stats engine recomputes its
    /// own figure from financial records)
    pub current_spent: f64,
    pub created_at: DateTime<Utc>,
}

/// Status of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Completed,
    Delayed,
}

/// A scheduled unit of work within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub project_id: String,
    pub phase_id: Option<String>,
    pub title: String,
    pub status: MilestoneStatus,
    pub scheduled_start: Option<NaiveDate>,
    pub scheduled_end: Option<NaiveDate>,
    /// Invariant: `0 <= progress_percentage <= 100`
    pub progress_percentage: u8,
    pub created_at: DateTime<Utc>,
}

impl Milestone {
    /// Clamps the progress percentage into its invariant range.
    ///
    /// Backend rows are not trusted to respect the bound.
    pub fn normalize(&mut self) {
        self.progress_percentage = self.progress_percentage.min(100);
    }

    pub fn is_completed(&self) -> bool {
        self.status == MilestoneStatus::Completed
    }
}

/// Category of a financial record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinancialCategory {
    BudgetItem,
    Payment,
    Expense,
    ChangeOrder,
}

/// Approval status of a financial record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinancialStatus {
    #[default]
    Pending,
    Approved,
    Paid,
    Overdue,
}

/// A signed money movement against a project.
///
/// Immutable once created from this core's point of view: only creation
/// and reads pass through here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: String,
    pub project_id: String,
    pub category: FinancialCategory,
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub status: FinancialStatus,
    pub created_at: DateTime<Utc>,
}

impl FinancialRecord {
    /// Whether this record counts toward budget consumption.
    pub fn counts_as_spend(&self) -> bool {
        matches!(
            self.category,
            FinancialCategory::Payment | FinancialCategory::Expense
        )
    }
}

/// Fields required to create a new financial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecordDraft {
    pub project_id: String,
    pub category: FinancialCategory,
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: FinancialStatus,
}
