//! Compliance decision engine
//!
//! Decides whether a contributor is authorized to contribute to a project.
//! ICLA coverage is checked first and short-circuits everything else; the
//! CCLA path requires an employee acknowledgment, the company's own CCLA
//! signature, and a whitelist match. A failed whitelist re-check revokes the
//! user's approved employee acknowledgments as a side effect.
//!
//! Store failures surface as `LookupFailed` so callers can always tell
//! "not signed" apart from "could not determine".

use std::sync::Arc;
use tracing::{debug, warn};

use crate::audit::AuditLog;
use crate::compliance::lookup::{latest_signature, meets_latest_major_version};
use crate::compliance::whitelist::{is_whitelisted, Candidate};
use crate::db::schemas::{DocumentType, EventDoc, EventType, ReferenceType, UserDoc};
use crate::github::IdentityResolver;
use crate::store::ComplianceStore;
use crate::types::{Result, TurnstileError};

/// How a contributor's authorization was established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Individual CLA signed by the contributor
    Icla,
    /// Corporate CLA of the contributor's employer plus whitelist confirmation
    EmployeeCcla,
}

/// Terminal outcome of one compliance decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Authorized(Coverage),
    Unauthorized,
}

impl Decision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Decision::Authorized(_))
    }
}

/// Compliance decision engine
pub struct ComplianceEngine {
    store: Arc<dyn ComplianceStore>,
    resolver: Arc<dyn IdentityResolver>,
    audit: Arc<dyn AuditLog>,
    /// Require ICLA signatures to match the latest major document version
    require_latest_major: bool,
}

impl ComplianceEngine {
    pub fn new(
        store: Arc<dyn ComplianceStore>,
        resolver: Arc<dyn IdentityResolver>,
        audit: Arc<dyn AuditLog>,
        require_latest_major: bool,
    ) -> Self {
        Self {
            store,
            resolver,
            audit,
            require_latest_major,
        }
    }

    /// Decide whether `user` is authorized to contribute to `project_id`.
    pub async fn authorize(&self, user: &UserDoc, project_id: &str) -> Result<Decision> {
        let project = self
            .store
            .load_project(project_id)
            .await
            .map_err(lookup_failed)?
            .ok_or_else(|| TurnstileError::NotFound(format!("project {}", project_id)))?;

        // ICLA takes precedence; a valid one ends the decision here and the
        // CCLA path (including the whitelist) is never evaluated.
        let icla = latest_signature(
            self.store.as_ref(),
            &user.user_id,
            ReferenceType::User,
            project_id,
            None,
        )
        .await
        .map_err(lookup_failed)?;

        if let Some(ref signature) = icla {
            let version_ok = !self.require_latest_major
                || meets_latest_major_version(signature, &project, DocumentType::Individual);
            if version_ok {
                debug!(user_id = %user.user_id, project_id, "ICLA check passed");
                return Ok(Decision::Authorized(Coverage::Icla));
            }
            debug!(
                user_id = %user.user_id,
                project_id,
                signed_major = signature.document_major_version,
                "ICLA signed against an old document major version"
            );
        }

        let Some(ref company_id) = user.user_company_id else {
            debug!(user_id = %user.user_id, project_id, "no ICLA and no company affiliation");
            return Ok(Decision::Unauthorized);
        };

        // Employee acknowledgment for this company on this project
        let employee_ack = latest_signature(
            self.store.as_ref(),
            &user.user_id,
            ReferenceType::User,
            project_id,
            Some(company_id),
        )
        .await
        .map_err(lookup_failed)?;

        if employee_ack.is_none() {
            debug!(user_id = %user.user_id, project_id, company_id, "no employee acknowledgment");
            return Ok(Decision::Unauthorized);
        }

        let company = self
            .store
            .load_company(company_id)
            .await
            .map_err(lookup_failed)?
            .ok_or_else(|| {
                TurnstileError::LookupFailed(format!(
                    "user {} references missing company {}",
                    user.user_id, company_id
                ))
            })?;

        // The company's own CCLA signature carries the whitelist rules
        let ccla = latest_signature(
            self.store.as_ref(),
            company_id,
            ReferenceType::Company,
            project_id,
            None,
        )
        .await
        .map_err(lookup_failed)?;

        let Some(ccla) = ccla else {
            debug!(company_id, project_id, "company has no signed CCLA");
            return Ok(Decision::Unauthorized);
        };

        let candidate = Candidate {
            emails: user.user_emails.clone(),
            github_username: user.user_github_username.clone(),
            github_id: user.user_github_id,
        };

        if is_whitelisted(self.resolver.as_ref(), &ccla, &candidate).await {
            debug!(user_id = %user.user_id, project_id, "CCLA whitelist check passed");
            return Ok(Decision::Authorized(Coverage::EmployeeCcla));
        }

        // Whitelist re-check failed: revoke every currently-approved employee
        // acknowledgment for this (user, project, company). Unconditional once
        // non-whitelisted status is detected.
        self.revoke_employee_signatures(user, project_id, &project.project_name, company_id, &company.company_name)
            .await;

        Ok(Decision::Unauthorized)
    }

    /// Flip `approved=false` on each approved employee acknowledgment and
    /// record one audit event per revoked signature. Per-signature write
    /// failures are logged and skipped; the next decision re-evaluates and
    /// converges.
    async fn revoke_employee_signatures(
        &self,
        user: &UserDoc,
        project_id: &str,
        project_name: &str,
        company_id: &str,
        company_name: &str,
    ) {
        let signatures = match self
            .store
            .signatures_by_reference(
                &user.user_id,
                ReferenceType::User,
                Some(project_id),
                Some(company_id),
                Some(true),
                Some(true),
            )
            .await
        {
            Ok(signatures) => signatures,
            Err(e) => {
                warn!(user_id = %user.user_id, project_id, error = %e, "unable to list employee signatures for revocation");
                return;
            }
        };

        for signature in signatures {
            if let Err(e) = self
                .store
                .set_signature_approved(&signature.signature_id, false)
                .await
            {
                warn!(
                    signature_id = %signature.signature_id,
                    error = %e,
                    "failed to revoke employee signature, will retry on next decision"
                );
                continue;
            }

            let event_data = format!(
                "employee signature of user {} disapproved for project {} and company {}",
                user.user_name, project_name, company_name
            );
            let mut event = EventDoc::new(EventType::EmployeeSignatureDisapproved, event_data);
            event.event_project_id = Some(project_id.to_string());
            event.event_company_id = Some(company_id.to_string());
            event.event_user_id = Some(user.user_id.clone());
            event.contains_pii = true;

            if let Err(e) = self.audit.record_event(event).await {
                warn!(signature_id = %signature.signature_id, error = %e, "failed to record revocation audit event");
            }
        }
    }
}

/// Map a backing-store error into the decision-level error kind
fn lookup_failed(e: TurnstileError) -> TurnstileError {
    match e {
        e @ TurnstileError::LookupFailed(_) => e,
        other => TurnstileError::LookupFailed(other.to_string()),
    }
}
