//! Error types for Turnstile
//!
//! The variants follow the compliance engine's error taxonomy: `NotFound` is
//! an expected, non-fatal outcome; `LookupFailed` means "could not determine"
//! and must never be conflated with "not authorized"; `InvariantViolation`
//! aborts a webhook batch; `MalformedEvent` payloads are logged and dropped.

use thiserror::Error;

/// Top-level error type for Turnstile
#[derive(Error, Debug)]
pub enum TurnstileError {
    /// Entity absent from the backing store (expected, non-fatal)
    #[error("not found: {0}")]
    NotFound(String),

    /// Backing-store or network error during a compliance decision.
    /// Callers must distinguish this from "not signed".
    #[error("lookup failed: {0}")]
    LookupFailed(String),

    /// Single-CLA-Group rule (or similar) broken - aborts the batch
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Unparseable webhook payload - dropped after logging
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// MongoDB operation failure
    #[error("database error: {0}")]
    Database(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Email relay failure
    #[error("email error: {0}")]
    Email(String),

    /// GitHub API failure
    #[error("github error: {0}")]
    GitHub(String),

    /// Socket or filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TurnstileError>;
