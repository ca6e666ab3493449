//! Audit event document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for audit events
pub const EVENT_COLLECTION: &str = "events";

/// Audit event types recorded by the compliance engine and lifecycle handler
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EmployeeSignatureDisapproved,
    RepositoryDisable,
    RepositoryAutoEnable,
    OrganizationEnrolled,
}

/// Audit event document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventDoc {
    pub event_id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub event_type: EventType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_project_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_company_id: Option<String>,

    /// User id, or the webhook sender login for lifecycle events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_user_id: Option<String>,

    /// Human-readable description of what happened
    pub event_data: String,

    /// Whether `event_data` contains personally identifiable information
    #[serde(default)]
    pub contains_pii: bool,
}

impl EventDoc {
    pub fn new(event_type: EventType, event_data: String) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            event_type,
            event_project_id: None,
            event_company_id: None,
            event_user_id: None,
            event_data,
            contains_pii: false,
        }
    }
}

impl Default for EventDoc {
    fn default() -> Self {
        Self::new(EventType::RepositoryDisable, String::new())
    }
}

impl IntoIndexes for EventDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "event_type": 1 },
                Some(
                    IndexOptions::builder()
                        .name("event_type_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "event_project_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("event_project_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for EventDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
