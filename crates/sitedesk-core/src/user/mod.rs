//! User profile domain models.

pub mod model;

pub use model::{Profile, ProfileSource, UserRole};
