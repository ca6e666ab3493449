//! Signature document schema
//!
//! A signature ties one reference entity (user or company) to one project.
//! Company signatures carry the CCLA whitelist rules; user signatures with a
//! non-null `user_ccla_company_id` are employee acknowledgments rather than
//! plain ICLAs.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for signatures
pub const SIGNATURE_COLLECTION: &str = "signatures";

/// What kind of entity signed
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    User,
    Company,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::User => "user",
            ReferenceType::Company => "company",
        }
    }
}

/// Agreement flavor
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignatureType {
    Cla,
    Dco,
}

impl Default for ReferenceType {
    fn default() -> Self {
        ReferenceType::User
    }
}

impl Default for SignatureType {
    fn default() -> Self {
        SignatureType::Cla
    }
}

/// Signature document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SignatureDoc {
    pub signature_id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub project_id: String,

    /// User id or company id, depending on `reference_type`
    pub reference_id: String,

    #[serde(default)]
    pub reference_type: ReferenceType,

    #[serde(default)]
    pub signature_type: SignatureType,

    /// Set by the signing-provider callback
    #[serde(default)]
    pub signed: bool,

    /// Set by manager action; revoked by the compliance engine when a
    /// whitelist re-check fails
    #[serde(default)]
    pub approved: bool,

    /// Document version snapshot taken at signing time
    #[serde(default)]
    pub document_major_version: i32,
    #[serde(default)]
    pub document_minor_version: i32,

    /// Non-null only for employee-acknowledgment signatures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ccla_company_id: Option<String>,

    // Whitelist rules, attached when reference_type = company
    #[serde(default)]
    pub email_whitelist: Vec<String>,
    #[serde(default)]
    pub domain_whitelist: Vec<String>,
    #[serde(default)]
    pub github_whitelist: Vec<String>,
    #[serde(default)]
    pub github_org_whitelist: Vec<String>,
}

impl SignatureDoc {
    pub fn new(
        signature_id: String,
        project_id: String,
        reference_id: String,
        reference_type: ReferenceType,
    ) -> Self {
        Self {
            signature_id,
            metadata: Metadata::new(),
            project_id,
            reference_id,
            reference_type,
            signature_type: SignatureType::Cla,
            signed: false,
            approved: false,
            document_major_version: 0,
            document_minor_version: 0,
            user_ccla_company_id: None,
            email_whitelist: Vec::new(),
            domain_whitelist: Vec::new(),
            github_whitelist: Vec::new(),
            github_org_whitelist: Vec::new(),
        }
    }

    /// True for signatures recording employee affiliation under a CCLA
    pub fn is_employee_acknowledgment(&self) -> bool {
        self.reference_type == ReferenceType::User && self.user_ccla_company_id.is_some()
    }

    /// Last-modified timestamp used for deterministic latest-signature
    /// selection; falls back to the epoch when metadata is absent.
    pub fn date_modified(&self) -> DateTime {
        self.metadata
            .updated_at
            .or(self.metadata.created_at)
            .unwrap_or_else(|| DateTime::from_millis(0))
    }
}

impl IntoIndexes for SignatureDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "signature_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("signature_id_unique".to_string())
                        .build(),
                ),
            ),
            // Reference index: all signatures for a user or company
            (
                doc! { "reference_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("signature_reference_index".to_string())
                        .build(),
                ),
            ),
            // Project index: all signatures under a project
            (
                doc! { "project_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("signature_project_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for SignatureDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
