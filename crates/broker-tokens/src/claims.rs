//! JWT claim sets
//!
//! Three distinct claim shapes, not mutually convertible:
//!
//! - [`AccessClaims`]: short-lived, stateless, carries display context and
//!   the derived role.
//! - [`RefreshClaims`]: long-lived, minimal, carries the unique `jti` that
//!   drives reuse detection. Deliberately excludes `name` and `role`.
//! - [`LegacyClaims`]: the older single-token shape, refreshable in place,
//!   with pass-through custom claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Issuer claim stamped on access and legacy tokens, checked strictly on
/// verification.
pub const TOKEN_ISSUER: &str = "unified-auth-server";

/// Claims of a short-lived access token.
///
/// Validity is determined solely by signature and `exp`; access tokens are
/// never persisted and never checked against the used-token store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    /// Subject, the user's email
    pub sub: String,

    /// User email
    pub email: String,

    /// Display name; absent on tokens minted by the refresh flow, which
    /// reconstructs lighter context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Project the token was issued for
    pub project_id: String,

    /// Derived role, when a role rule matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issuer
    pub iss: String,
}

impl AccessClaims {
    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

/// Claims of a long-lived, single-use refresh token.
///
/// The `jti` is globally unique; its presence in the used-token store is
/// the single source of truth for "already consumed".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshClaims {
    /// Subject, the user's email
    pub sub: String,

    /// User email
    pub email: String,

    /// Project the token was issued for
    pub project_id: String,

    /// Unique token id for reuse detection
    pub jti: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl RefreshClaims {
    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Claims of a legacy single token.
///
/// One long-lived token serving as both identity and session, refreshable
/// in place by re-signing with a new `exp` while preserving custom claims
/// (role, picture, ...). Deprecated in favor of the rotating pair, kept
/// behaviorally intact for older clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegacyClaims {
    /// Subject, the user's email
    pub sub: String,

    /// User email
    pub email: String,

    /// Display name
    pub name: String,

    /// Project the token was issued for
    pub project_id: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issuer
    pub iss: String,

    /// Custom claims preserved across in-place refreshes
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl LegacyClaims {
    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}
