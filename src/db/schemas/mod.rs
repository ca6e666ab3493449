//! Database schemas for Turnstile
//!
//! Defines MongoDB document structures for projects, signatures, users,
//! companies, GitHub organizations, repositories, and audit events.

mod company;
mod event;
mod github_org;
mod metadata;
mod project;
mod repository;
mod signature;
mod user;

pub use company::{CompanyDoc, COMPANY_COLLECTION};
pub use event::{EventDoc, EventType, EVENT_COLLECTION};
pub use github_org::{GithubOrgDoc, GITHUB_ORG_COLLECTION};
pub use metadata::Metadata;
pub use project::{DocumentRevision, DocumentType, ProjectDoc, PROJECT_COLLECTION};
pub use repository::{RepositoryDoc, REPOSITORY_COLLECTION};
pub use signature::{ReferenceType, SignatureDoc, SignatureType, SIGNATURE_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
