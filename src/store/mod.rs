//! Typed store over the MongoDB collections
//!
//! The compliance engine and the lifecycle state machine consume the store
//! through narrow traits so tests can run against in-memory fakes. `ClaStore`
//! is the MongoDB implementation of both.

use bson::doc;
use tracing::debug;

use crate::db::schemas::{
    CompanyDoc, GithubOrgDoc, ProjectDoc, ReferenceType, RepositoryDoc, SignatureDoc, UserDoc,
    COMPANY_COLLECTION, GITHUB_ORG_COLLECTION, PROJECT_COLLECTION, REPOSITORY_COLLECTION,
    SIGNATURE_COLLECTION, USER_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::{Result, TurnstileError};

/// Store surface consumed by the compliance decision engine
#[async_trait::async_trait]
pub trait ComplianceStore: Send + Sync {
    /// All signatures for a reference entity, optionally narrowed by project,
    /// employee-acknowledgment company, and signed/approved state.
    async fn signatures_by_reference(
        &self,
        reference_id: &str,
        reference_type: ReferenceType,
        project_id: Option<&str>,
        user_ccla_company_id: Option<&str>,
        signed: Option<bool>,
        approved: Option<bool>,
    ) -> Result<Vec<SignatureDoc>>;

    async fn load_project(&self, project_id: &str) -> Result<Option<ProjectDoc>>;

    async fn load_company(&self, company_id: &str) -> Result<Option<CompanyDoc>>;

    /// Flip the approved flag on a single signature
    async fn set_signature_approved(&self, signature_id: &str, approved: bool) -> Result<()>;
}

/// Store surface consumed by the org/repo lifecycle state machine
#[async_trait::async_trait]
pub trait LifecycleStore: Send + Sync {
    async fn load_organization(&self, organization_name: &str) -> Result<Option<GithubOrgDoc>>;

    /// Record (or re-sync) the app installation id for an organization
    async fn set_installation_id(&self, organization_name: &str, installation_id: i64)
        -> Result<()>;

    async fn repositories_by_organization(
        &self,
        organization_name: &str,
    ) -> Result<Vec<RepositoryDoc>>;

    async fn repository_by_external_id(&self, external_id: i64)
        -> Result<Option<RepositoryDoc>>;

    /// Disable a repository and append an audit note. Disabling an already
    /// disabled repository is a no-op apart from the extra note.
    async fn disable_repository(&self, repository_id: &str, note: &str) -> Result<()>;

    async fn create_repository(&self, repository: RepositoryDoc) -> Result<()>;

    async fn find_project(&self, project_id: &str) -> Result<Option<ProjectDoc>>;
}

/// MongoDB-backed store
#[derive(Clone)]
pub struct ClaStore {
    mongo: MongoClient,
}

impl ClaStore {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    pub async fn project(&self, project_id: &str) -> Result<Option<ProjectDoc>> {
        let collection = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        collection.find_one(doc! { "project_id": project_id }).await
    }

    pub async fn company(&self, company_id: &str) -> Result<Option<CompanyDoc>> {
        let collection = self.mongo.collection::<CompanyDoc>(COMPANY_COLLECTION).await?;
        collection.find_one(doc! { "company_id": company_id }).await
    }

    pub async fn user(&self, user_id: &str) -> Result<Option<UserDoc>> {
        let collection = self.mongo.collection::<UserDoc>(USER_COLLECTION).await?;
        collection.find_one(doc! { "user_id": user_id }).await
    }

    pub async fn signature(&self, signature_id: &str) -> Result<Option<SignatureDoc>> {
        let collection = self
            .mongo
            .collection::<SignatureDoc>(SIGNATURE_COLLECTION)
            .await?;
        collection.find_one(doc! { "signature_id": signature_id }).await
    }

    pub async fn insert_signature(&self, signature: SignatureDoc) -> Result<()> {
        let collection = self
            .mongo
            .collection::<SignatureDoc>(SIGNATURE_COLLECTION)
            .await?;
        collection.insert_one(signature).await
    }

    pub async fn set_signature_signed(&self, signature_id: &str, signed: bool) -> Result<()> {
        let collection = self
            .mongo
            .collection::<SignatureDoc>(SIGNATURE_COLLECTION)
            .await?;
        let result = collection
            .update_one(
                doc! { "signature_id": signature_id },
                doc! { "$set": { "signed": signed } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(TurnstileError::NotFound(format!(
                "signature {}",
                signature_id
            )));
        }
        Ok(())
    }

    pub async fn insert_organization(&self, organization: GithubOrgDoc) -> Result<()> {
        let collection = self
            .mongo
            .collection::<GithubOrgDoc>(GITHUB_ORG_COLLECTION)
            .await?;
        collection.insert_one(organization).await
    }

    pub async fn organization(&self, organization_name: &str) -> Result<Option<GithubOrgDoc>> {
        let collection = self
            .mongo
            .collection::<GithubOrgDoc>(GITHUB_ORG_COLLECTION)
            .await?;
        collection
            .find_one(doc! { "organization_name": organization_name })
            .await
    }

    pub async fn insert_repository(&self, repository: RepositoryDoc) -> Result<()> {
        let collection = self
            .mongo
            .collection::<RepositoryDoc>(REPOSITORY_COLLECTION)
            .await?;
        collection.insert_one(repository).await
    }

    pub async fn org_repositories(&self, organization_name: &str) -> Result<Vec<RepositoryDoc>> {
        let collection = self
            .mongo
            .collection::<RepositoryDoc>(REPOSITORY_COLLECTION)
            .await?;
        collection
            .find_many(doc! { "repository_organization_name": organization_name })
            .await
    }
}

#[async_trait::async_trait]
impl ComplianceStore for ClaStore {
    async fn signatures_by_reference(
        &self,
        reference_id: &str,
        reference_type: ReferenceType,
        project_id: Option<&str>,
        user_ccla_company_id: Option<&str>,
        signed: Option<bool>,
        approved: Option<bool>,
    ) -> Result<Vec<SignatureDoc>> {
        let collection = self
            .mongo
            .collection::<SignatureDoc>(SIGNATURE_COLLECTION)
            .await?;

        let mut filter = doc! {
            "reference_id": reference_id,
            "reference_type": reference_type.as_str(),
        };
        if let Some(project_id) = project_id {
            filter.insert("project_id", project_id);
        }
        match user_ccla_company_id {
            // Employee acknowledgments carry the company id; plain ICLAs must not
            Some(company_id) => filter.insert("user_ccla_company_id", company_id),
            None => filter.insert("user_ccla_company_id", doc! { "$exists": false }),
        };
        if let Some(signed) = signed {
            filter.insert("signed", signed);
        }
        if let Some(approved) = approved {
            filter.insert("approved", approved);
        }

        debug!(reference_id, ?reference_type, "querying signatures by reference");
        collection.find_many(filter).await
    }

    async fn load_project(&self, project_id: &str) -> Result<Option<ProjectDoc>> {
        self.project(project_id).await
    }

    async fn load_company(&self, company_id: &str) -> Result<Option<CompanyDoc>> {
        self.company(company_id).await
    }

    async fn set_signature_approved(&self, signature_id: &str, approved: bool) -> Result<()> {
        let collection = self
            .mongo
            .collection::<SignatureDoc>(SIGNATURE_COLLECTION)
            .await?;
        let result = collection
            .update_one(
                doc! { "signature_id": signature_id },
                doc! { "$set": { "approved": approved } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(TurnstileError::NotFound(format!(
                "signature {}",
                signature_id
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LifecycleStore for ClaStore {
    async fn load_organization(&self, organization_name: &str) -> Result<Option<GithubOrgDoc>> {
        self.organization(organization_name).await
    }

    async fn set_installation_id(
        &self,
        organization_name: &str,
        installation_id: i64,
    ) -> Result<()> {
        let collection = self
            .mongo
            .collection::<GithubOrgDoc>(GITHUB_ORG_COLLECTION)
            .await?;
        let result = collection
            .update_one(
                doc! { "organization_name": organization_name },
                doc! { "$set": { "installation_id": installation_id } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(TurnstileError::NotFound(format!(
                "organization {}",
                organization_name
            )));
        }
        Ok(())
    }

    async fn repositories_by_organization(
        &self,
        organization_name: &str,
    ) -> Result<Vec<RepositoryDoc>> {
        self.org_repositories(organization_name).await
    }

    async fn repository_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<RepositoryDoc>> {
        let collection = self
            .mongo
            .collection::<RepositoryDoc>(REPOSITORY_COLLECTION)
            .await?;
        collection
            .find_one(doc! { "repository_external_id": external_id })
            .await
    }

    async fn disable_repository(&self, repository_id: &str, note: &str) -> Result<()> {
        let collection = self
            .mongo
            .collection::<RepositoryDoc>(REPOSITORY_COLLECTION)
            .await?;
        let result = collection
            .update_one(
                doc! { "repository_id": repository_id },
                doc! {
                    "$set": { "enabled": false },
                    "$push": { "notes": note },
                },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(TurnstileError::NotFound(format!(
                "repository {}",
                repository_id
            )));
        }
        Ok(())
    }

    async fn create_repository(&self, repository: RepositoryDoc) -> Result<()> {
        self.insert_repository(repository).await
    }

    async fn find_project(&self, project_id: &str) -> Result<Option<ProjectDoc>> {
        self.project(project_id).await
    }
}
