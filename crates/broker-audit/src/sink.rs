//! Audit sinks
//!
//! Recording an audit event is fire-and-forget: a sink must never raise
//! into the caller's critical path. A failing backend logs and drops the
//! event rather than failing the login that produced it.

use crate::types::AuditEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record an event. Infallible at the call surface.
    async fn record(&self, event: AuditEvent);
}

/// In-memory audit sink.
///
/// Suitable for tests and single-process development; production
/// deployments implement [`AuditSink`] over their log store.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, in order.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }

    /// Number of recorded events.
    pub async fn count(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) {
        self.events.write().await.push(event);
    }
}

/// Audit sink that emits tracing records.
///
/// Security events are logged at warn level so they stand out in the
/// stream; everything else at info.
#[derive(Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    /// Create the sink.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        if event.event_type.is_security_event() {
            tracing::warn!(
                event_type = event.event_type.as_str(),
                project_id = %event.project_id,
                email = %event.email,
                details = %event.details,
                ip_address = event.ip_address.as_deref(),
                "Security audit event"
            );
        } else {
            tracing::info!(
                event_type = event.event_type.as_str(),
                project_id = %event.project_id,
                email = %event.email,
                details = %event.details,
                "Audit event"
            );
        }
    }
}
