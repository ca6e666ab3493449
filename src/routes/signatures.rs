//! Signature management endpoints
//!
//! POST /v2/signatures            - create a signature record
//! PUT  /v2/signatures/{id}/signed   - signing-provider callback
//! PUT  /v2/signatures/{id}/approved - manager approval toggle
//!
//! Reference and signature types are closed enums validated here at the
//! boundary; everything past this point can trust them.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::schemas::{ReferenceType, SignatureDoc, SignatureType};
use crate::server::AppState;
use crate::store::{ClaStore, ComplianceStore};
use crate::types::TurnstileError;

#[derive(Deserialize)]
struct NewSignatureRequest {
    project_id: String,
    reference_id: String,
    reference_type: ReferenceType,
    #[serde(default)]
    signature_type: SignatureType,
    #[serde(default)]
    document_major_version: i32,
    #[serde(default)]
    document_minor_version: i32,
    /// Present only for employee acknowledgments
    #[serde(default)]
    user_ccla_company_id: Option<String>,
    #[serde(default)]
    email_whitelist: Vec<String>,
    #[serde(default)]
    domain_whitelist: Vec<String>,
    #[serde(default)]
    github_whitelist: Vec<String>,
    #[serde(default)]
    github_org_whitelist: Vec<String>,
}

pub async fn handle_create_signature(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let Some(store) = require_store(&state) else {
        return store_unavailable();
    };

    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({"error": format!("Failed to read body: {}", e)}),
            );
        }
    };

    // Serde rejects unknown reference/signature types here, before anything
    // touches the database
    let request: NewSignatureRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({"error": format!("Invalid JSON: {}", e)}),
            );
        }
    };

    if request.project_id.is_empty() || request.reference_id.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({"error": "project_id and reference_id are required"}),
        );
    }

    let mut signature = SignatureDoc::new(
        Uuid::new_v4().to_string(),
        request.project_id,
        request.reference_id,
        request.reference_type,
    );
    signature.signature_type = request.signature_type;
    signature.document_major_version = request.document_major_version;
    signature.document_minor_version = request.document_minor_version;
    signature.user_ccla_company_id = request.user_ccla_company_id;
    signature.email_whitelist = request.email_whitelist;
    signature.domain_whitelist = request.domain_whitelist;
    signature.github_whitelist = request.github_whitelist;
    signature.github_org_whitelist = request.github_org_whitelist;

    let signature_id = signature.signature_id.clone();
    match store.insert_signature(signature).await {
        Ok(()) => {
            info!(signature_id = %signature_id, "signature created");
            json_response(
                StatusCode::CREATED,
                &serde_json::json!({"signature_id": signature_id}),
            )
        }
        Err(e) => {
            error!(error = %e, "failed to create signature");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({"error": "Failed to create signature"}),
            )
        }
    }
}

#[derive(Deserialize)]
struct SignedRequest {
    signed: bool,
}

pub async fn handle_set_signed(
    req: Request<Incoming>,
    state: Arc<AppState>,
    signature_id: &str,
) -> Response<Full<Bytes>> {
    let Some(store) = require_store(&state) else {
        return store_unavailable();
    };

    let request: SignedRequest = match read_json(req).await {
        Ok(r) => r,
        Err(response) => return *response,
    };

    match store.set_signature_signed(signature_id, request.signed).await {
        Ok(()) => {
            info!(signature_id, signed = request.signed, "signature signed flag updated");
            json_response(
                StatusCode::OK,
                &serde_json::json!({"signature_id": signature_id, "signed": request.signed}),
            )
        }
        Err(e) => flag_update_error(signature_id, e),
    }
}

#[derive(Deserialize)]
struct ApprovedRequest {
    approved: bool,
}

pub async fn handle_set_approved(
    req: Request<Incoming>,
    state: Arc<AppState>,
    signature_id: &str,
) -> Response<Full<Bytes>> {
    let Some(store) = require_store(&state) else {
        return store_unavailable();
    };

    let request: ApprovedRequest = match read_json(req).await {
        Ok(r) => r,
        Err(response) => return *response,
    };

    match store
        .set_signature_approved(signature_id, request.approved)
        .await
    {
        Ok(()) => {
            info!(signature_id, approved = request.approved, "signature approved flag updated");
            json_response(
                StatusCode::OK,
                &serde_json::json!({"signature_id": signature_id, "approved": request.approved}),
            )
        }
        Err(e) => flag_update_error(signature_id, e),
    }
}

fn flag_update_error(signature_id: &str, e: TurnstileError) -> Response<Full<Bytes>> {
    match e {
        TurnstileError::NotFound(_) => json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({"error": format!("Signature {} not found", signature_id)}),
        ),
        e => {
            error!(signature_id, error = %e, "failed to update signature");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({"error": "Failed to update signature"}),
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

fn require_store(state: &AppState) -> Option<&Arc<ClaStore>> {
    state.store.as_ref()
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
