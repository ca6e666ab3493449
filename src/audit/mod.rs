//! Audit event recording
//!
//! Compliance decisions and lifecycle transitions leave an audit trail in the
//! events collection. Recording is best-effort at call sites: a failed audit
//! write never changes a compliance decision.

use tracing::info;

use crate::db::schemas::{EventDoc, EVENT_COLLECTION};
use crate::db::MongoClient;
use crate::types::Result;

/// Trait for audit sinks - allows swapping implementations
#[async_trait::async_trait]
pub trait AuditLog: Send + Sync {
    async fn record_event(&self, event: EventDoc) -> Result<()>;
}

/// MongoDB-backed audit log
pub struct MongoAuditLog {
    mongo: MongoClient,
}

impl MongoAuditLog {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }
}

#[async_trait::async_trait]
impl AuditLog for MongoAuditLog {
    async fn record_event(&self, event: EventDoc) -> Result<()> {
        let collection = self.mongo.collection::<EventDoc>(EVENT_COLLECTION).await?;
        collection.insert_one(event).await
    }
}

/// Log-only audit sink for dev mode without MongoDB
pub struct LogAuditLog;

#[async_trait::async_trait]
impl AuditLog for LogAuditLog {
    async fn record_event(&self, event: EventDoc) -> Result<()> {
        info!(
            event_type = ?event.event_type,
            project_id = ?event.event_project_id,
            data = %event.event_data,
            "audit event (log only)"
        );
        Ok(())
    }
}
