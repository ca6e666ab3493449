//! GitHub organization document schema
//!
//! Tracks the app installation per organization. `installation_id` is set by
//! the `installation.created` webhook; `auto_enabled` turns on automatic
//! repository enrollment for orgs fully covered by a single CLA Group.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for GitHub organizations
pub const GITHUB_ORG_COLLECTION: &str = "github_orgs";

/// GitHub organization document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct GithubOrgDoc {
    /// Organization login, the natural key
    pub organization_name: String,

    #[serde(default)]
    pub metadata: Metadata,

    /// External platform (SFDC) identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_sfid: Option<String>,

    /// GitHub app installation id, set once the org enrolls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<i64>,

    /// Automatically enroll new repositories added under this org
    #[serde(default)]
    pub auto_enabled: bool,
}

impl GithubOrgDoc {
    pub fn new(organization_name: String, organization_sfid: Option<String>) -> Self {
        Self {
            organization_name,
            metadata: Metadata::new(),
            organization_sfid,
            installation_id: None,
            auto_enabled: false,
        }
    }
}

impl IntoIndexes for GithubOrgDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "organization_name": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("organization_name_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "installation_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("installation_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for GithubOrgDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
