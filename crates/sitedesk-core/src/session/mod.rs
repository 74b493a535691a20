//! Session domain models and auth lifecycle types.

pub mod event;
pub mod model;
pub mod state;

pub use event::AuthEvent;
pub use model::{Session, SessionMetadata};
pub use state::AuthState;
