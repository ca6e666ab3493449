//! Organization and repository management endpoints
//!
//! POST /v2/github/organizations          - register an organization
//! GET  /v2/organizations/{org}/repositories - list tracked repositories
//! POST /v2/repositories                  - enroll a repository manually
//!
//! Organizations must be registered here before their app installation
//! webhook is accepted; the webhook side never creates organizations.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::schemas::{GithubOrgDoc, RepositoryDoc};
use crate::server::AppState;

#[derive(Deserialize)]
struct NewOrganizationRequest {
    organization_name: String,
    #[serde(default)]
    organization_sfid: Option<String>,
    #[serde(default)]
    auto_enabled: bool,
}

pub async fn handle_create_organization(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let Some(ref store) = state.store else {
        return store_unavailable();
    };

    let request: NewOrganizationRequest = match read_json(req).await {
        Ok(r) => r,
        Err(response) => return *response,
    };

    if request.organization_name.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({"error": "organization_name is required"}),
        );
    }

    let mut organization =
        GithubOrgDoc::new(request.organization_name.clone(), request.organization_sfid);
    organization.auto_enabled = request.auto_enabled;

    match store.insert_organization(organization).await {
        Ok(()) => {
            info!(organization_name = %request.organization_name, "organization registered");
            json_response(
                StatusCode::CREATED,
                &serde_json::json!({"organization_name": request.organization_name}),
            )
        }
        Err(e) => {
            error!(organization_name = %request.organization_name, error = %e, "failed to register organization");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({"error": "Failed to register organization"}),
            )
        }
    }
}

#[derive(Deserialize)]
struct NewRepositoryRequest {
    repository_project_id: String,
    /// Full "org/repo" name
    repository_name: String,
    repository_organization_name: String,
    #[serde(default)]
    repository_external_id: Option<i64>,
    #[serde(default)]
    repository_sfdc_id: Option<String>,
}

pub async fn handle_create_repository(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let Some(ref store) = state.store else {
        return store_unavailable();
    };

    let request: NewRepositoryRequest = match read_json(req).await {
        Ok(r) => r,
        Err(response) => return *response,
    };

    if request.repository_project_id.is_empty() || request.repository_name.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({"error": "repository_project_id and repository_name are required"}),
        );
    }

    let mut repository = RepositoryDoc::new(
        Uuid::new_v4().to_string(),
        request.repository_project_id,
        request.repository_name,
        request.repository_organization_name,
    );
    repository.repository_external_id = request.repository_external_id;
    repository.repository_sfdc_id = request.repository_sfdc_id;

    let repository_id = repository.repository_id.clone();
    match store.insert_repository(repository).await {
        Ok(()) => {
            info!(repository_id = %repository_id, "repository enrolled");
            json_response(
                StatusCode::CREATED,
                &serde_json::json!({"repository_id": repository_id}),
            )
        }
        Err(e) => {
            error!(error = %e, "failed to enroll repository");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({"error": "Failed to enroll repository"}),
            )
        }
    }
}

#[derive(Serialize)]
struct RepositoryListResponse {
    organization_name: String,
    repositories: Vec<RepositorySummary>,
}

#[derive(Serialize)]
struct RepositorySummary {
    repository_id: String,
    repository_name: String,
    repository_project_id: String,
    repository_url: String,
    enabled: bool,
}

pub async fn handle_list_repositories(
    state: Arc<AppState>,
    organization_name: &str,
) -> Response<Full<Bytes>> {
    let Some(ref store) = state.store else {
        return store_unavailable();
    };

    match store.org_repositories(organization_name).await {
        Ok(repositories) => {
            let repositories = repositories
                .into_iter()
                .map(|r| RepositorySummary {
                    repository_id: r.repository_id,
                    repository_name: r.repository_name,
                    repository_project_id: r.repository_project_id,
                    repository_url: r.repository_url,
                    enabled: r.enabled,
                })
                .collect();
            json_response(
                StatusCode::OK,
                &RepositoryListResponse {
                    organization_name: organization_name.to_string(),
                    repositories,
                },
            )
        }
        Err(e) => {
            error!(organization_name, error = %e, "failed to list repositories");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({"error": "Failed to list repositories"}),
            )
        }
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, Box<Response<Full<Bytes>>>> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return Err(Box::new(json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({"error": format!("Failed to read body: {}", e)}),
            )));
        }
    };
    serde_json::from_slice(&body).map_err(|e| {
        Box::new(json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({"error": format!("Invalid JSON: {}", e)}),
        ))
    })
}

fn store_unavailable() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::SERVICE_UNAVAILABLE,
        &serde_json::json!({"error": "Store not available"}),
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json_body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json_body)))
        .unwrap()
}
