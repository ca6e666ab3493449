//! GitHub activity webhook endpoint
//!
//! POST /v2/github/activity receives app installation and repository events.
//! GitHub's event name travels in the `X-GitHub-Event` header; the body is
//! the JSON payload. GitHub does not usefully retry on error responses, so a
//! syntactically accepted delivery always gets a 200: malformed payloads are
//! logged and dropped, business failures surface in logs and the status body.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::lifecycle::{ActivityEvent, ActivityOutcome};
use crate::server::AppState;
use crate::types::TurnstileError;

#[derive(Serialize)]
struct ActivityResponse {
    status: String,
}

pub async fn handle_activity(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let Some(ref processor) = state.processor else {
        return json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &serde_json::json!({"error": "Lifecycle processing not available"}),
        );
    };

    // The event name is metadata, not payload; a request without it is not
    // a webhook delivery at all
    let Some(event_type) = req
        .headers()
        .get("x-github-event")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
    else {
        return json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({"error": "Missing X-GitHub-Event header"}),
        );
    };

    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(event_type, error = %e, "failed to read webhook body");
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({"error": format!("Failed to read body: {}", e)}),
            );
        }
    };

    // Malformed payloads are dropped, never bounced back to the sender
    let event: ActivityEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            let err = TurnstileError::MalformedEvent(e.to_string());
            warn!(event_type, error = %err, "dropping malformed webhook payload");
            return json_response(
                StatusCode::OK,
                &ActivityResponse {
                    status: "malformed payload dropped".to_string(),
                },
            );
        }
    };

    let status = match processor.process(&event_type, event).await {
        ActivityOutcome::Handled { status } => status,
        ActivityOutcome::Ignored => "event ignored".to_string(),
    };

    json_response(StatusCode::OK, &ActivityResponse { status })
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json_body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json_body)))
        .unwrap()
}
