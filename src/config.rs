//! Configuration for Turnstile
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Turnstile - CLA compliance gateway
///
/// Decides whether contributors are authorized to contribute to a project
/// and keeps repository enrollment in sync with GitHub webhook events.
#[derive(Parser, Debug, Clone)]
#[command(name = "turnstile")]
#[command(about = "CLA compliance gateway for GitHub organizations")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "turnstile")]
    pub mongodb_db: String,

    /// GitHub REST API base URL (override for GitHub Enterprise or tests)
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// GitHub API token for identity lookups (unauthenticated if absent)
    #[arg(long, env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    /// Email relay endpoint; when unset, notification emails are logged only
    #[arg(long, env = "EMAIL_RELAY_URL")]
    pub email_relay_url: Option<String>,

    /// Sender address for notification emails
    #[arg(long, env = "EMAIL_FROM", default_value = "no-reply@turnstile.local")]
    pub email_from: String,

    /// Require ICLA signatures to match the latest major document version
    #[arg(long, env = "REQUIRE_LATEST_MAJOR", default_value = "false")]
    pub require_latest_major: bool,

    /// Enable development mode (MongoDB connection becomes optional)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Outbound request timeout in milliseconds (GitHub, email relay)
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        if !self.github_api_url.starts_with("http://") && !self.github_api_url.starts_with("https://") {
            return Err("GITHUB_API_URL must be an http(s) URL".to_string());
        }

        if let Some(ref relay) = self.email_relay_url {
            if !relay.starts_with("http://") && !relay.starts_with("https://") {
                return Err("EMAIL_RELAY_URL must be an http(s) URL".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["turnstile"])
    }

    #[test]
    fn test_defaults_validate() {
        assert!(base_args().validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut args = base_args();
        args.request_timeout_ms = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_bad_relay_url_rejected() {
        let mut args = base_args();
        args.email_relay_url = Some("smtp://mail.example.com".to_string());
        assert!(args.validate().is_err());
    }
}
