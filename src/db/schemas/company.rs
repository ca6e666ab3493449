//! Company document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for companies
pub const COMPANY_COLLECTION: &str = "companies";

/// Company document stored in MongoDB
///
/// A company owns at most one CCLA signature per project; that signature
/// carries the whitelist rules its employees are checked against.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CompanyDoc {
    pub company_id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub company_name: String,

    /// Primary CLA manager
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_manager_id: Option<String>,

    /// Manager identities allowed to administer the company
    #[serde(default)]
    pub acl: Vec<String>,
}

impl CompanyDoc {
    pub fn new(company_id: String, company_name: String) -> Self {
        Self {
            company_id,
            metadata: Metadata::new(),
            company_name,
            company_manager_id: None,
            acl: Vec::new(),
        }
    }
}

impl IntoIndexes for CompanyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "company_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("company_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CompanyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
