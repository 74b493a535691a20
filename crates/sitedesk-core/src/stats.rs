//! Summary statistics derived from the cached working set.
//!
//! Pure derivation: no internal state, no I/O. Recomputed wholesale on
//! every cache mutation, which is cheap because the record sets are
//! capped. Every percentage with a zero denominator yields 0.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::project::{FinancialRecord, Milestone, Project};

/// Summary metrics for the current project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    /// Completed milestones / total milestones, rounded; 0 with no milestones
    pub completion_percentage: u32,
    /// Spend (payments + expenses) / total budget, rounded; 0 with no budget
    pub budget_used: u32,
    /// Calendar days until the estimated completion date; negative when
    /// overdue, `None` when no date is set
    pub days_remaining: Option<i64>,
    pub total_spent: f64,
    pub total_budget: f64,
}

/// Derives stats from the current snapshot contents.
///
/// `today` is passed in rather than read from the clock so derivation
/// stays deterministic under test.
pub fn compute(
    project: &Project,
    milestones: &[Milestone],
    records: &[FinancialRecord],
    today: NaiveDate,
) -> ProjectStats {
    let total_milestones = milestones.len();
    let completed_milestones = milestones.iter().filter(|m| m.is_completed()).count();
    let completion_percentage = if total_milestones > 0 {
        ((completed_milestones as f64 / total_milestones as f64) * 100.0).round() as u32
    } else {
        0
    };

    let total_spent: f64 = records
        .iter()
        .filter(|r| r.counts_as_spend())
        .map(|r| r.amount)
        .sum();

    let total_budget = project.total_budget.unwrap_or(0.0);
    let budget_used = if total_budget > 0.0 {
        ((total_spent / total_budget) * 100.0).round() as u32
    } else {
        0
    };

    let days_remaining = project
        .estimated_completion
        .map(|estimated| (estimated - today).num_days());

    ProjectStats {
        completion_percentage,
        budget_used,
        days_remaining,
        total_spent,
        total_budget,
    }
}
