//! GitHub organization and repository lifecycle management

pub mod events;
pub mod handler;
pub mod notify;

pub use events::ActivityEvent;
pub use handler::{ActivityOutcome, ActivityProcessor};
