//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection. Routing is a
//! match over (method, path); path parameters are peeled off with
//! strip_prefix/strip_suffix rather than a router crate.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::compliance::ComplianceEngine;
use crate::config::Args;
use crate::lifecycle::ActivityProcessor;
use crate::routes;
use crate::store::ClaStore;
use crate::types::TurnstileError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// MongoDB-backed store; None in dev mode without a database
    pub store: Option<Arc<ClaStore>>,
    /// Compliance decision engine; requires the store
    pub engine: Option<Arc<ComplianceEngine>>,
    /// Webhook lifecycle processor; requires the store
    pub processor: Option<Arc<ActivityProcessor>>,
}

pub async fn run(state: Arc<AppState>) -> Result<(), TurnstileError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Turnstile listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - running without a database is allowed");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe - 200 whenever the process is running
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Readiness probe - 200 only when compliance decisions can be served
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        // GitHub activity webhook (installation and repository events)
        (Method::POST, "/v2/github/activity") => {
            routes::handle_activity(req, Arc::clone(&state)).await
        }

        // Contributor authorization check
        // GET /v2/user/{user_id}/project/{project_id}/authorized
        (Method::GET, p)
            if p.starts_with("/v2/user/") && p.ends_with("/authorized") =>
        {
            let middle = p
                .strip_prefix("/v2/user/")
                .and_then(|s| s.strip_suffix("/authorized"))
                .unwrap_or("");
            match middle.split_once("/project/") {
                Some((user_id, project_id)) if !user_id.is_empty() && !project_id.is_empty() => {
                    routes::handle_user_authorized(Arc::clone(&state), user_id, project_id).await
                }
                _ => not_found_response(&path),
            }
        }

        // Signature management
        (Method::POST, "/v2/signatures") => {
            routes::handle_create_signature(req, Arc::clone(&state)).await
        }
        (Method::PUT, p) if p.starts_with("/v2/signatures/") && p.ends_with("/signed") => {
            let signature_id = p
                .strip_prefix("/v2/signatures/")
                .and_then(|s| s.strip_suffix("/signed"))
                .unwrap_or("");
            routes::handle_set_signed(req, Arc::clone(&state), signature_id).await
        }
        (Method::PUT, p) if p.starts_with("/v2/signatures/") && p.ends_with("/approved") => {
            let signature_id = p
                .strip_prefix("/v2/signatures/")
                .and_then(|s| s.strip_suffix("/approved"))
                .unwrap_or("");
            routes::handle_set_approved(req, Arc::clone(&state), signature_id).await
        }

        // Organization and repository management
        (Method::POST, "/v2/github/organizations") => {
            routes::handle_create_organization(req, Arc::clone(&state)).await
        }
        (Method::POST, "/v2/repositories") => {
            routes::handle_create_repository(req, Arc::clone(&state)).await
        }
        (Method::GET, p)
            if p.starts_with("/v2/organizations/") && p.ends_with("/repositories") =>
        {
            let organization_name = p
                .strip_prefix("/v2/organizations/")
                .and_then(|s| s.strip_suffix("/repositories"))
                .unwrap_or("");
            routes::handle_list_repositories(Arc::clone(&state), organization_name).await
        }

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    // Path parameter extraction mirrors the dispatch arms above
    #[test]
    fn test_authorized_path_split() {
        let p = "/v2/user/u-1/project/p-9/authorized";
        let middle = p
            .strip_prefix("/v2/user/")
            .and_then(|s| s.strip_suffix("/authorized"))
            .unwrap();
        assert_eq!(middle.split_once("/project/"), Some(("u-1", "p-9")));
    }

    #[test]
    fn test_signature_path_split() {
        let p = "/v2/signatures/sig-42/approved";
        let signature_id = p
            .strip_prefix("/v2/signatures/")
            .and_then(|s| s.strip_suffix("/approved"))
            .unwrap();
        assert_eq!(signature_id, "sig-42");
    }
}
