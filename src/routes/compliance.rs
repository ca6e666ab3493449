//! Contributor authorization endpoint
//!
//! GET /v2/user/{user_id}/project/{project_id}/authorized answers the one
//! question CI gates care about: may this user contribute to this project
//! right now? An infrastructure failure during the decision is a 500, never
//! a quiet "unauthorized".

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::compliance::{Coverage, Decision};
use crate::server::AppState;
use crate::types::TurnstileError;

#[derive(Serialize)]
struct AuthorizedResponse {
    authorized: bool,
    /// How authorization was established, when it was
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage: Option<&'static str>,
}

pub async fn handle_user_authorized(
    state: Arc<AppState>,
    user_id: &str,
    project_id: &str,
) -> Response<Full<Bytes>> {
    let (Some(store), Some(engine)) = (&state.store, &state.engine) else {
        return json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &serde_json::json!({"error": "Compliance engine not available"}),
        );
    };

    let user = match store.user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return json_response(
                StatusCode::NOT_FOUND,
                &serde_json::json!({"error": format!("User {} not found", user_id)}),
            );
        }
        Err(e) => {
            error!(user_id, error = %e, "user lookup failed");
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({"error": "User lookup failed"}),
            );
        }
    };

    match engine.authorize(&user, project_id).await {
        Ok(decision) => {
            info!(
                user_id,
                project_id,
                authorized = decision.is_authorized(),
                "compliance decision served"
            );
            let coverage = match decision {
                Decision::Authorized(Coverage::Icla) => Some("icla"),
                Decision::Authorized(Coverage::EmployeeCcla) => Some("employee_ccla"),
                Decision::Unauthorized => None,
            };
            json_response(
                StatusCode::OK,
                &AuthorizedResponse {
                    authorized: decision.is_authorized(),
                    coverage,
                },
            )
        }
        Err(TurnstileError::NotFound(what)) => json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({"error": format!("{} not found", what)}),
        ),
        Err(e) => {
            error!(user_id, project_id, error = %e, "compliance decision failed");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({"error": "Unable to complete compliance check"}),
            )
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json_body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json_body)))
        .unwrap()
}
