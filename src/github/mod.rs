//! GitHub identity resolution
//!
//! The whitelist matcher needs two lookups: a username for a numeric GitHub
//! id, and the organizations a username belongs to. Both are best-effort:
//! callers treat failures as "cannot confirm", never as a hard denial.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{Result, TurnstileError};

/// Trait for GitHub identity lookups - allows swapping implementations
/// (reqwest-backed for prod, in-memory for tests)
#[async_trait::async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a GitHub numeric id to a username. `None` when the id does
    /// not resolve (deleted account, bad id).
    async fn resolve_github_username(&self, github_id: i64) -> Result<Option<String>>;

    /// List the organization logins a username belongs to.
    async fn resolve_github_orgs(&self, username: &str) -> Result<Vec<String>>;
}

/// GitHub REST API client
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct LoginPayload {
    login: String,
}

impl GithubClient {
    pub fn new(base_url: &str, token: Option<String>, timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("turnstile/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TurnstileError::GitHub(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url).header("Accept", "application/vnd.github+json");
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[async_trait::async_trait]
impl IdentityResolver for GithubClient {
    async fn resolve_github_username(&self, github_id: i64) -> Result<Option<String>> {
        let url = format!("{}/user/{}", self.base_url, github_id);
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| TurnstileError::GitHub(format!("user lookup failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(github_id, "no GitHub user for id");
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(TurnstileError::GitHub(format!(
                "user lookup returned {}",
                response.status()
            )));
        }

        let payload: LoginPayload = response
            .json()
            .await
            .map_err(|e| TurnstileError::GitHub(format!("user lookup body: {}", e)))?;

        Ok(Some(payload.login))
    }

    async fn resolve_github_orgs(&self, username: &str) -> Result<Vec<String>> {
        let url = format!("{}/users/{}/orgs", self.base_url, username);
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| TurnstileError::GitHub(format!("org lookup failed: {}", e)))?;

        if !response.status().is_success() {
            warn!(username, status = %response.status(), "GitHub org lookup failed");
            return Err(TurnstileError::GitHub(format!(
                "org lookup returned {}",
                response.status()
            )));
        }

        let payload: Vec<LoginPayload> = response
            .json()
            .await
            .map_err(|e| TurnstileError::GitHub(format!("org lookup body: {}", e)))?;

        Ok(payload.into_iter().map(|o| o.login).collect())
    }
}
