//! Audit event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of audit event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A login attempt passed every policy check and tokens were issued
    LoginSuccess,
    /// A login attempt was denied by a policy check
    LoginFailed,
    /// A refresh token was redeemed for a new pair
    TokenRefreshed,
    /// A previously-consumed refresh token was replayed (security event)
    RefreshReuseDetected,
    /// A user logged out
    Logout,
}

impl AuditEventType {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::LoginSuccess => "login_success",
            AuditEventType::LoginFailed => "login_failed",
            AuditEventType::TokenRefreshed => "token_refreshed",
            AuditEventType::RefreshReuseDetected => "refresh_reuse_detected",
            AuditEventType::Logout => "logout",
        }
    }

    /// Whether this event must be surfaced as a security event.
    pub fn is_security_event(&self) -> bool {
        matches!(self, AuditEventType::RefreshReuseDetected)
    }
}

/// Audit event envelope.
///
/// Records who did what against which project, with free-form details the
/// emitting flow considers useful (violation kind, groups, org unit, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: Uuid,

    /// Event kind
    pub event_type: AuditEventType,

    /// Project the attempt targeted
    pub project_id: String,

    /// User email involved
    pub email: String,

    /// Structured details
    pub details: serde_json::Value,

    /// Client address, when known
    pub ip_address: Option<String>,

    /// Client user agent, when known
    pub user_agent: Option<String>,

    /// When the event was recorded
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(
        event_type: AuditEventType,
        project_id: impl Into<String>,
        email: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type,
            project_id: project_id.into(),
            email: email.into(),
            details,
            ip_address: None,
            user_agent: None,
            recorded_at: Utc::now(),
        }
    }

    /// Set the client address.
    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Set the client user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_serialization() {
        let json = serde_json::to_value(AuditEventType::RefreshReuseDetected).unwrap();
        assert_eq!(json, "refresh_reuse_detected");
        assert_eq!(AuditEventType::LoginFailed.as_str(), "login_failed");
    }

    #[test]
    fn test_security_event_flag() {
        assert!(AuditEventType::RefreshReuseDetected.is_security_event());
        assert!(!AuditEventType::LoginFailed.is_security_event());
    }

    #[test]
    fn test_event_builders() {
        let event = AuditEvent::new(
            AuditEventType::LoginSuccess,
            "portal",
            "yamada@i-seifu.jp",
            serde_json::json!({"role": "office"}),
        )
        .with_ip_address("203.0.113.7")
        .with_user_agent("Mozilla/5.0");

        assert_eq!(event.project_id, "portal");
        assert_eq!(event.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(event.details["role"], "office");
    }
}
