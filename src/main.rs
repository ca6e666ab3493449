//! Turnstile - CLA compliance gateway

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use turnstile::{
    audit::{AuditLog, LogAuditLog, MongoAuditLog},
    compliance::ComplianceEngine,
    config::Args,
    db::MongoClient,
    github::{GithubClient, IdentityResolver},
    lifecycle::ActivityProcessor,
    notify::{EmailService, LogMailer, RelayMailer},
    server::{self, AppState},
    store::ClaStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("turnstile={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Turnstile - CLA Compliance Gateway");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("GitHub API: {}", args.github_api_url);
    info!(
        "Email relay: {}",
        args.email_relay_url.as_deref().unwrap_or("(log only)")
    );
    info!("Require latest major version: {}", args.require_latest_major);
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "MongoDB connection failed (dev mode, continuing without): {}",
                    e
                );
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // GitHub identity lookups for whitelist evaluation
    let github: Arc<dyn IdentityResolver> = match GithubClient::new(
        &args.github_api_url,
        args.github_token.clone(),
        args.request_timeout_ms,
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("GitHub client setup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Manager notifications via the HTTP relay, or logging in its absence
    let mailer: Arc<dyn EmailService> = match args.email_relay_url {
        Some(ref relay_url) => match RelayMailer::new(
            relay_url.clone(),
            args.email_from.clone(),
            args.request_timeout_ms,
        ) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                error!("Email relay setup failed: {}", e);
                std::process::exit(1);
            }
        },
        None => Arc::new(LogMailer),
    };

    let audit: Arc<dyn AuditLog> = match mongo {
        Some(ref client) => Arc::new(MongoAuditLog::new(client.clone())),
        None => Arc::new(LogAuditLog),
    };

    // Store, engine, and webhook processor sit on top of MongoDB; without it
    // (dev mode) the matching endpoints answer 503
    let store = mongo.as_ref().map(|client| Arc::new(ClaStore::new(client.clone())));

    let engine = store.as_ref().map(|store| {
        Arc::new(ComplianceEngine::new(
            Arc::clone(store) as Arc<dyn turnstile::store::ComplianceStore>,
            Arc::clone(&github),
            Arc::clone(&audit),
            args.require_latest_major,
        ))
    });

    let processor = store.as_ref().map(|store| {
        Arc::new(ActivityProcessor::new(
            Arc::clone(store) as Arc<dyn turnstile::store::LifecycleStore>,
            Arc::clone(&mailer),
            Arc::clone(&audit),
        ))
    });

    let state = Arc::new(AppState {
        args,
        store,
        engine,
        processor,
    });

    server::run(state).await?;
    Ok(())
}
