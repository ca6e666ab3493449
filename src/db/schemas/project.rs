//! Project (CLA Group) document schema
//!
//! A project groups repositories under a shared ICLA/CCLA policy and owns the
//! ordered individual and corporate document revisions contributors sign.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for projects
pub const PROJECT_COLLECTION: &str = "projects";

/// Whether a document revision belongs to the individual or corporate set
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Individual,
    Corporate,
}

/// One signable revision of a CLA document, embedded in its project.
///
/// Major versions are monotonically increasing; minor versions reset or
/// increment within a major version.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DocumentRevision {
    pub major_version: i32,
    pub minor_version: i32,
    /// Human-readable document name
    pub name: String,
    /// External storage reference for the rendered document, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
}

/// Project document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProjectDoc {
    /// Project (CLA Group) identifier
    pub project_id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub project_name: String,

    /// External platform (SFDC) identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_external_id: Option<String>,

    #[serde(default)]
    pub icla_enabled: bool,

    #[serde(default)]
    pub ccla_enabled: bool,

    /// When true, employees must also sign an ICLA on top of CCLA coverage
    #[serde(default)]
    pub ccla_requires_icla: bool,

    /// Ordered individual document revisions (majors monotone)
    #[serde(default)]
    pub individual_documents: Vec<DocumentRevision>,

    /// Ordered corporate document revisions (majors monotone)
    #[serde(default)]
    pub corporate_documents: Vec<DocumentRevision>,

    /// Manager identities (emails) allowed to administer the project
    #[serde(default)]
    pub acl: Vec<String>,
}

impl ProjectDoc {
    pub fn new(project_id: String, project_name: String) -> Self {
        Self {
            project_id,
            metadata: Metadata::new(),
            project_name,
            project_external_id: None,
            icla_enabled: true,
            ccla_enabled: true,
            ccla_requires_icla: false,
            individual_documents: Vec::new(),
            corporate_documents: Vec::new(),
            acl: Vec::new(),
        }
    }

    /// Highest major version across the document set of the given type.
    /// `None` when the project has no documents of that type.
    pub fn latest_major_version(&self, document_type: DocumentType) -> Option<i32> {
        let documents = match document_type {
            DocumentType::Individual => &self.individual_documents,
            DocumentType::Corporate => &self.corporate_documents,
        };
        documents.iter().map(|d| d.major_version).max()
    }
}

impl IntoIndexes for ProjectDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "project_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("project_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ProjectDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revision(major: i32, minor: i32) -> DocumentRevision {
        DocumentRevision {
            major_version: major,
            minor_version: minor,
            name: format!("v{}.{}", major, minor),
            content_url: None,
        }
    }

    #[test]
    fn test_latest_major_version() {
        let mut project = ProjectDoc::new("p1".into(), "Test".into());
        assert_eq!(project.latest_major_version(DocumentType::Individual), None);

        project.individual_documents = vec![revision(1, 0), revision(2, 0), revision(2, 1)];
        project.corporate_documents = vec![revision(1, 3)];

        assert_eq!(project.latest_major_version(DocumentType::Individual), Some(2));
        assert_eq!(project.latest_major_version(DocumentType::Corporate), Some(1));
    }
}
