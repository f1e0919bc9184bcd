//! # Broker Audit
//!
//! Audit trail for the unified auth broker.
//!
//! ## Overview
//!
//! Every authorization decision (successful login, policy denial, token
//! refresh, detected refresh-token replay) is recorded as an
//! [`AuditEvent`] through an [`AuditSink`]. Recording is fire-and-forget:
//! a sink never propagates failures into the login or refresh that
//! produced the event.
//!
//! Two sinks ship here: [`MemoryAuditSink`] for tests and development, and
//! [`TracingAuditSink`] emitting structured log records (warn level for
//! security events). Production backends implement the trait over their
//! own log store.

pub mod sink;
pub mod types;

// Re-export main types
pub use sink::{AuditSink, MemoryAuditSink, TracingAuditSink};
pub use types::{AuditEvent, AuditEventType};
