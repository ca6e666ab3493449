//! Turnstile - CLA compliance gateway
//!
//! Decides whether a contributor is authorized to contribute to a project
//! under the projects' Contributor License Agreements, and keeps GitHub
//! repository enrollment in sync with app installation webhook events.
//!
//! ## Services
//!
//! - **Compliance**: ICLA/CCLA decision engine with whitelist evaluation
//! - **Lifecycle**: GitHub webhook state machine for org/repo enrollment
//! - **Signatures**: signature records, signing callbacks, manager approval
//! - **Notify**: manager notification emails via an HTTP relay

pub mod audit;
pub mod compliance;
pub mod config;
pub mod db;
pub mod github;
pub mod lifecycle;
pub mod notify;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TurnstileError};
