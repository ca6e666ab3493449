//! User document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    pub user_id: String,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub user_name: String,

    /// All verified email addresses for this user
    #[serde(default)]
    pub user_emails: Vec<String>,

    /// Employer, when the user has confirmed an affiliation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_company_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_github_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_github_username: Option<String>,
}

impl UserDoc {
    pub fn new(user_id: String, user_name: String) -> Self {
        Self {
            user_id,
            metadata: Metadata::new(),
            user_name,
            user_emails: Vec::new(),
            user_company_id: None,
            user_github_id: None,
            user_github_username: None,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_github_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_github_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
