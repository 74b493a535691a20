//! Project, milestone, and financial record domain models.

pub mod model;

pub use model::{
    FinancialCategory, FinancialRecord, FinancialRecordDraft, FinancialStatus, Milestone,
    MilestoneStatus, Project, ProjectStatus,
};
