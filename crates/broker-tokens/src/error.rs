//! Error types for token operations

use thiserror::Error;

/// Token error types.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token `exp` has passed
    #[error("Token has expired")]
    TokenExpired,

    /// Malformed token, bad signature, wrong issuer, or wrong claim shape
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Legacy token expired beyond the refresh grace window
    #[error("Token expired {days_since_expiry} days ago, too old to refresh")]
    TokenTooOldToRefresh {
        /// Days elapsed since the token's `exp`
        days_since_expiry: i64,
    },

    /// No configured source yielded a signing key.
    ///
    /// This is a fatal configuration error, not a per-request failure.
    #[error("JWT signing key unavailable")]
    SigningKeyUnavailable,

    /// Encoding or other internal failure
    #[error("Internal token error: {0}")]
    Internal(String),
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
