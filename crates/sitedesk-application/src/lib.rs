pub mod dashboard;
pub mod project;
pub mod session;
pub mod snapshot;

pub use dashboard::Dashboard;
pub use project::ProjectService;
pub use session::SessionService;
pub use snapshot::{DashboardSnapshot, SnapshotStore};
