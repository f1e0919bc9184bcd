//! Error types for the authorization pipeline

use broker_config::ConfigError;
use broker_policy::PolicyViolation;
use broker_tokens::TokenError;
use thiserror::Error;

/// Errors surfaced by login and refresh flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity failed the project's access policy.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// Token signing or verification failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Project configuration lookup failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A refresh token was redeemed more than once.
    #[error("Refresh token has already been used: {jti}")]
    RefreshTokenReused { jti: String },

    /// The upstream identity provider rejected the authorization code.
    #[error("Authorization code exchange failed: {0}")]
    OAuthExchangeFailed(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Policy(_) => 403,
            AuthError::Token(TokenError::SigningKeyUnavailable) => 500,
            AuthError::Token(TokenError::Internal(_)) => 500,
            AuthError::Token(_) => 401,
            AuthError::Config(ConfigError::ProjectNotFound(_)) => 404,
            AuthError::Config(_) => 500,
            AuthError::RefreshTokenReused { .. } => 401,
            AuthError::OAuthExchangeFailed(_) => 502,
        }
    }

    /// Returns a machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Policy(_) => "ACCESS_DENIED",
            AuthError::Token(TokenError::TokenExpired) => "TOKEN_EXPIRED",
            AuthError::Token(TokenError::TokenTooOldToRefresh { .. }) => "TOKEN_TOO_OLD",
            AuthError::Token(TokenError::SigningKeyUnavailable) => "SIGNING_KEY_UNAVAILABLE",
            AuthError::Token(_) => "INVALID_TOKEN",
            AuthError::Config(ConfigError::ProjectNotFound(_)) => "PROJECT_NOT_FOUND",
            AuthError::Config(_) => "INVALID_PROJECT_CONFIG",
            AuthError::RefreshTokenReused { .. } => "REFRESH_TOKEN_REUSED",
            AuthError::OAuthExchangeFailed(_) => "OAUTH_EXCHANGE_FAILED",
        }
    }

    /// True when the error warrants a security audit event.
    pub fn is_security_event(&self) -> bool {
        matches!(self, AuthError::RefreshTokenReused { .. })
    }
}

/// Result type for authorization operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let denied = AuthError::Policy(PolicyViolation::StudentNotAllowed {
            email: "1234567@x.jp".to_string(),
        });
        assert_eq!(denied.status_code(), 403);

        let expired = AuthError::Token(TokenError::TokenExpired);
        assert_eq!(expired.status_code(), 401);
        assert_eq!(expired.error_code(), "TOKEN_EXPIRED");

        let missing = AuthError::Config(ConfigError::ProjectNotFound("p".to_string()));
        assert_eq!(missing.status_code(), 404);

        let reused = AuthError::RefreshTokenReused {
            jti: "abc".to_string(),
        };
        assert_eq!(reused.status_code(), 401);
        assert!(reused.is_security_event());

        let upstream = AuthError::OAuthExchangeFailed("bad code".to_string());
        assert_eq!(upstream.status_code(), 502);
        assert!(!upstream.is_security_event());
    }
}
