use crate::entry::AuditEvent;
use crate::error::{AuditError, Result};
use async_trait::async_trait;
use logger_redacted::{LoggerConfig, PiiRedactor};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Destination for audit events
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<()>;
}

/// In-memory sink for testing and development
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<RwLock<Vec<AuditEvent>>>,
    fail_writes: Arc<RwLock<bool>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }

    /// Make subsequent writes fail, to exercise error paths
    pub fn set_failing(&self, failing: bool) {
        *self.fail_writes.write() = failing;
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<()> {
        if *self.fail_writes.read() {
            return Err(AuditError::StorageError("audit store unavailable".to_string()));
        }
        self.events.write().push(event);
        Ok(())
    }
}

/// Sink that emits events as structured `audit` log lines after redaction
pub struct TracingAuditSink {
    redactor: PiiRedactor,
}

impl TracingAuditSink {
    pub fn new(redactor: PiiRedactor) -> Self {
        Self { redactor }
    }

    /// Redacts unless the logging section turns redaction off
    pub fn from_logger_config(config: &LoggerConfig) -> Self {
        Self::new(PiiRedactor::from_logger_config(config))
    }
}

impl Default for TracingAuditSink {
    fn default() -> Self {
        Self::new(PiiRedactor::default())
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<()> {
        let before = self.redactor.redact_json(event.before);
        let after = self.redactor.redact_json(event.after);

        info!(
            target: "audit",
            audit_id = %event.id,
            action = %event.action,
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            clinic_id = ?event.clinic_id,
            before = %before,
            after = %after,
            "{}",
            self.redactor.redact(&event.summary)
        );
        Ok(())
    }
}
