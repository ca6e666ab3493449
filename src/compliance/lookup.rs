//! Signature lookup
//!
//! Selects the signed and approved signature a compliance decision rests on.
//! Multiple qualifying signatures should not exist, but when they do the most
//! recently modified one wins so the decision stays deterministic.

use crate::db::schemas::{DocumentType, ProjectDoc, ReferenceType, SignatureDoc};
use crate::store::ComplianceStore;
use crate::types::Result;

/// Find the latest signed+approved signature for a reference entity on a
/// project. `company_id` selects the employee-acknowledgment signature
/// instead of a plain ICLA.
pub async fn latest_signature(
    store: &dyn ComplianceStore,
    reference_id: &str,
    reference_type: ReferenceType,
    project_id: &str,
    company_id: Option<&str>,
) -> Result<Option<SignatureDoc>> {
    let signatures = store
        .signatures_by_reference(
            reference_id,
            reference_type,
            Some(project_id),
            company_id,
            Some(true),
            Some(true),
        )
        .await?;

    Ok(signatures
        .into_iter()
        .max_by_key(|signature| signature.date_modified()))
}

/// Whether a signature's document snapshot is at the latest major version of
/// the project's document set. A project without documents of that type
/// cannot satisfy the requirement.
pub fn meets_latest_major_version(
    signature: &SignatureDoc,
    project: &ProjectDoc,
    document_type: DocumentType,
) -> bool {
    match project.latest_major_version(document_type) {
        Some(major) => signature.document_major_version == major,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{CompanyDoc, DocumentRevision, Metadata};
    use crate::types::TurnstileError;
    use bson::DateTime;

    struct FakeStore {
        signatures: Vec<SignatureDoc>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ComplianceStore for FakeStore {
        async fn signatures_by_reference(
            &self,
            reference_id: &str,
            reference_type: ReferenceType,
            project_id: Option<&str>,
            user_ccla_company_id: Option<&str>,
            signed: Option<bool>,
            approved: Option<bool>,
        ) -> Result<Vec<SignatureDoc>> {
            if self.fail {
                return Err(TurnstileError::Database("connection reset".into()));
            }
            Ok(self
                .signatures
                .iter()
                .filter(|s| s.reference_id == reference_id)
                .filter(|s| s.reference_type == reference_type)
                .filter(|s| project_id.is_none() || Some(s.project_id.as_str()) == project_id)
                .filter(|s| s.user_ccla_company_id.as_deref() == user_ccla_company_id)
                .filter(|s| signed.is_none() || Some(s.signed) == signed)
                .filter(|s| approved.is_none() || Some(s.approved) == approved)
                .cloned()
                .collect())
        }

        async fn load_project(&self, _project_id: &str) -> Result<Option<ProjectDoc>> {
            Ok(None)
        }

        async fn load_company(&self, _company_id: &str) -> Result<Option<CompanyDoc>> {
            Ok(None)
        }

        async fn set_signature_approved(&self, _signature_id: &str, _approved: bool) -> Result<()> {
            Ok(())
        }
    }

    fn signature(id: &str, modified_millis: i64) -> SignatureDoc {
        let mut sig = SignatureDoc::new("".into(), "p1".into(), "u1".into(), ReferenceType::User);
        sig.signature_id = id.to_string();
        sig.signed = true;
        sig.approved = true;
        sig.metadata = Metadata {
            created_at: Some(DateTime::from_millis(modified_millis)),
            updated_at: Some(DateTime::from_millis(modified_millis)),
        };
        sig
    }

    #[tokio::test]
    async fn test_latest_signature_picks_most_recent() {
        let store = FakeStore {
            signatures: vec![signature("old", 1_000), signature("new", 2_000)],
            fail: false,
        };
        let found = latest_signature(&store, "u1", ReferenceType::User, "p1", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.signature_id, "new");
    }

    #[tokio::test]
    async fn test_latest_signature_excludes_employee_acknowledgments() {
        let mut employee = signature("employee", 5_000);
        employee.user_ccla_company_id = Some("c1".into());
        let store = FakeStore {
            signatures: vec![signature("icla", 1_000), employee],
            fail: false,
        };

        let found = latest_signature(&store, "u1", ReferenceType::User, "p1", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.signature_id, "icla");

        let found = latest_signature(&store, "u1", ReferenceType::User, "p1", Some("c1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.signature_id, "employee");
    }

    #[tokio::test]
    async fn test_latest_signature_none_when_absent() {
        let store = FakeStore {
            signatures: Vec::new(),
            fail: false,
        };
        let found = latest_signature(&store, "u1", ReferenceType::User, "p1", None)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = FakeStore {
            signatures: Vec::new(),
            fail: true,
        };
        let result = latest_signature(&store, "u1", ReferenceType::User, "p1", None).await;
        assert!(matches!(result, Err(TurnstileError::Database(_))));
    }

    #[test]
    fn test_meets_latest_major_version() {
        let mut project = ProjectDoc::new("p1".into(), "Test".into());
        project.individual_documents = vec![
            DocumentRevision {
                major_version: 1,
                minor_version: 0,
                name: "v1.0".into(),
                content_url: None,
            },
            DocumentRevision {
                major_version: 2,
                minor_version: 0,
                name: "v2.0".into(),
                content_url: None,
            },
        ];

        let mut sig = signature("s", 0);
        sig.document_major_version = 2;
        assert!(meets_latest_major_version(&sig, &project, DocumentType::Individual));

        sig.document_major_version = 1;
        assert!(!meets_latest_major_version(&sig, &project, DocumentType::Individual));

        // No corporate documents at all
        sig.document_major_version = 0;
        assert!(!meets_latest_major_version(&sig, &project, DocumentType::Corporate));
    }
}
