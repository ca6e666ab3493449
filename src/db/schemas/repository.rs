//! Repository document schema
//!
//! Repositories are never hard-deleted: removal events flip `enabled` off and
//! append a timestamped note to the audit trail.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for repositories
pub const REPOSITORY_COLLECTION: &str = "repositories";

/// Repository document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RepositoryDoc {
    pub repository_id: String,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning project (CLA Group) id
    pub repository_project_id: String,

    /// Full name, e.g. "acme/widgets"
    pub repository_name: String,

    /// Organization login the repository lives under
    pub repository_organization_name: String,

    /// External platform id (GitHub repository id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_external_id: Option<i64>,

    pub repository_url: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Free-text audit trail, appended on lifecycle transitions
    #[serde(default)]
    pub notes: Vec<String>,

    /// SFDC identifier shared by every repository in an auto-enabled org
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_sfdc_id: Option<String>,
}

fn default_true() -> bool {
    true
}

impl RepositoryDoc {
    pub fn new(
        repository_id: String,
        repository_project_id: String,
        repository_name: String,
        repository_organization_name: String,
    ) -> Self {
        let repository_url = format!("https://github.com/{}", repository_name);
        Self {
            repository_id,
            metadata: Metadata::new(),
            repository_project_id,
            repository_name,
            repository_organization_name,
            repository_external_id: None,
            repository_url,
            enabled: true,
            notes: Vec::new(),
            repository_sfdc_id: None,
        }
    }
}

impl IntoIndexes for RepositoryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "repository_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("repository_id_unique".to_string())
                        .build(),
                ),
            ),
            // All repositories under an organization
            (
                doc! { "repository_organization_name": 1 },
                Some(
                    IndexOptions::builder()
                        .name("repository_organization_index".to_string())
                        .build(),
                ),
            ),
            // Webhook events reference repositories by external platform id
            (
                doc! { "repository_external_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("repository_external_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for RepositoryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
