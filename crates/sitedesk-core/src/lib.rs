pub mod config;
pub mod error;
pub mod feed;
pub mod project;
pub mod session;
pub mod stats;
pub mod store;
pub mod user;

// Re-export common error type
pub use error::SitedeskError;
