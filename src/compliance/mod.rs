//! CLA compliance determination
//!
//! Composes signature lookup and whitelist matching into the ICLA-before-CCLA
//! authorization decision.

pub mod engine;
pub mod lookup;
pub mod whitelist;

pub use engine::{ComplianceEngine, Coverage, Decision};
pub use lookup::{latest_signature, meets_latest_major_version};
pub use whitelist::{is_whitelisted, matches_domain_pattern, Candidate};
