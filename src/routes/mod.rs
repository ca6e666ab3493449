//! HTTP routes for Turnstile

pub mod compliance;
pub mod health;
pub mod repositories;
pub mod signatures;
pub mod webhook;

pub use compliance::handle_user_authorized;
pub use health::{health_check, readiness_check, version_info};
pub use repositories::{
    handle_create_organization, handle_create_repository, handle_list_repositories,
};
pub use signatures::{handle_create_signature, handle_set_approved, handle_set_signed};
pub use webhook::handle_activity;
