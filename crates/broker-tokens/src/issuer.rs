//! Token issuance and verification
//!
//! This module provides the [`TokenIssuer`] over the jsonwebtoken crate:
//! short-lived access tokens, rotating single-use refresh tokens, and the
//! deprecated legacy single-token mode that older clients still depend on.

use crate::claims::{AccessClaims, LegacyClaims, RefreshClaims, TOKEN_ISSUER};
use crate::error::{TokenError, TokenResult};
use crate::keys::{KeyCache, SigningKeySource, StaticKeySource};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Token issuance configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Issuer claim stamped on access and legacy tokens
    pub issuer: String,

    /// Access token lifetime (design constant, short)
    pub access_token_ttl: Duration,

    /// Default refresh token lifetime in days
    pub refresh_token_ttl_days: i64,

    /// Default legacy token lifetime in days
    pub legacy_expiry_days: i64,

    /// Days past expiry during which a legacy token may still be refreshed
    pub legacy_grace_days: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: TOKEN_ISSUER.to_string(),
            access_token_ttl: Duration::hours(1),
            refresh_token_ttl_days: 30,
            legacy_expiry_days: 30,
            legacy_grace_days: 7,
        }
    }
}

/// Token pair containing access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived)
    pub access_token: String,

    /// Refresh token (long-lived, single-use)
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Access token expiration in seconds
    pub expires_in: i64,
}

impl TokenPair {
    /// Create a new token pair.
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Generate a fresh unique token id.
///
/// 32 alphanumeric characters, about 190 bits of entropy; collisions are a
/// design error, not a runtime case.
fn new_jti() -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// JWT issuer for broker session tokens.
pub struct TokenIssuer {
    config: TokenConfig,
    keys: KeyCache,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("config", &self.config)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

impl TokenIssuer {
    /// Create an issuer over the given key source.
    ///
    /// The key is resolved lazily on first use and cached; an unresolvable
    /// key surfaces as [`TokenError::SigningKeyUnavailable`].
    pub fn new(config: TokenConfig, key_source: Arc<dyn SigningKeySource>) -> Self {
        Self {
            config,
            keys: KeyCache::new(key_source),
        }
    }

    /// Create with a static secret and default configuration.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self::new(
            TokenConfig::default(),
            Arc::new(StaticKeySource::new(secret)),
        )
    }

    /// Get the configuration.
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    fn encode_claims<T: Serialize>(&self, claims: &T) -> TokenResult<String> {
        let keys = self.keys.resolve()?;
        encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
            .map_err(|e| TokenError::Internal(format!("Token encoding failed: {}", e)))
    }

    fn map_decode_error(e: jsonwebtoken::errors::Error) -> TokenError {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                TokenError::InvalidToken("Malformed token".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                TokenError::InvalidToken("Invalid signature".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                TokenError::InvalidToken("Invalid issuer".to_string())
            }
            _ => TokenError::InvalidToken(e.to_string()),
        }
    }

    /// Issue a short-lived access token.
    ///
    /// `name` and `role` are encoded only when present; tokens minted by
    /// the refresh flow omit both. `ttl_secs` overrides the configured
    /// default lifetime, letting each project set its own.
    pub fn issue_access_token(
        &self,
        email: &str,
        name: Option<&str>,
        project_id: &str,
        role: Option<&str>,
        ttl_secs: Option<i64>,
    ) -> TokenResult<String> {
        let ttl = ttl_secs
            .map(Duration::seconds)
            .unwrap_or(self.config.access_token_ttl);
        let now = Utc::now();
        let claims = AccessClaims {
            sub: email.to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            project_id: project_id.to_string(),
            role: role.map(str::to_string),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = self.encode_claims(&claims)?;
        tracing::debug!(email = %email, project_id = %project_id, "Issued access token");
        Ok(token)
    }

    /// Issue a long-lived, single-use refresh token with a fresh `jti`.
    pub fn issue_refresh_token(
        &self,
        email: &str,
        project_id: &str,
        ttl_days: i64,
    ) -> TokenResult<String> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: email.to_string(),
            email: email.to_string(),
            project_id: project_id.to_string(),
            jti: new_jti(),
            iat: now.timestamp(),
            exp: (now + Duration::days(ttl_days)).timestamp(),
        };

        let token = self.encode_claims(&claims)?;
        tracing::debug!(email = %email, project_id = %project_id, jti = %claims.jti,
            "Issued refresh token");
        Ok(token)
    }

    /// Issue an access/refresh token pair.
    ///
    /// Both lifetimes come from the project's policy; `access_ttl_secs`
    /// falls back to the configured default when `None`.
    pub fn issue_pair(
        &self,
        email: &str,
        name: Option<&str>,
        project_id: &str,
        role: Option<&str>,
        access_ttl_secs: Option<i64>,
        refresh_ttl_days: i64,
    ) -> TokenResult<TokenPair> {
        let access = self.issue_access_token(email, name, project_id, role, access_ttl_secs)?;
        let refresh = self.issue_refresh_token(email, project_id, refresh_ttl_days)?;
        Ok(TokenPair::new(
            access,
            refresh,
            access_ttl_secs.unwrap_or_else(|| self.config.access_token_ttl.num_seconds()),
        ))
    }

    /// Validate and decode an access token.
    ///
    /// The issuer claim is checked strictly; a refresh token fails here
    /// because it carries no `iss`.
    ///
    /// # Errors
    ///
    /// [`TokenError::TokenExpired`] when `exp` has passed;
    /// [`TokenError::InvalidToken`] for any signature, structure, or issuer
    /// mismatch.
    pub fn verify_access_token(&self, token: &str) -> TokenResult<AccessClaims> {
        let keys = self.keys.resolve()?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);

        let data: TokenData<AccessClaims> =
            decode(token, &keys.decoding, &validation).map_err(Self::map_decode_error)?;
        Ok(data.claims)
    }

    /// Validate and decode a refresh token.
    ///
    /// Same failure modes as access tokens; an access token fails here
    /// because it carries no `jti`.
    pub fn verify_refresh_token(&self, token: &str) -> TokenResult<RefreshClaims> {
        let keys = self.keys.resolve()?;
        let validation = Validation::new(Algorithm::HS256);

        let data: TokenData<RefreshClaims> =
            decode(token, &keys.decoding, &validation).map_err(Self::map_decode_error)?;
        Ok(data.claims)
    }

    /// Issue a legacy single token (deprecated path).
    ///
    /// Custom claims (role, picture, ...) ride along and survive in-place
    /// refreshes.
    pub fn issue_legacy_token(
        &self,
        email: &str,
        name: &str,
        project_id: &str,
        expiry_days: Option<i64>,
        custom: HashMap<String, serde_json::Value>,
    ) -> TokenResult<String> {
        let now = Utc::now();
        let days = expiry_days.unwrap_or(self.config.legacy_expiry_days);
        let claims = LegacyClaims {
            sub: email.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            project_id: project_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(days)).timestamp(),
            iss: self.config.issuer.clone(),
            custom,
        };

        let token = self.encode_claims(&claims)?;
        tracing::info!(email = %email, project_id = %project_id, "Issued legacy token");
        Ok(token)
    }

    /// Validate and decode a legacy token.
    pub fn verify_legacy_token(&self, token: &str) -> TokenResult<LegacyClaims> {
        let keys = self.keys.resolve()?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);

        let data: TokenData<LegacyClaims> =
            decode(token, &keys.decoding, &validation).map_err(Self::map_decode_error)?;
        Ok(data.claims)
    }

    /// Refresh a legacy token in place, preserving custom claims.
    ///
    /// The signature is verified with expiry checking disabled so an
    /// already-expired token can still be refreshed, but only within the
    /// configured grace window past `exp`.
    ///
    /// # Errors
    ///
    /// [`TokenError::TokenTooOldToRefresh`] beyond the grace window;
    /// [`TokenError::InvalidToken`] for signature or structure problems.
    pub fn refresh_legacy_token(
        &self,
        token: &str,
        expiry_days: Option<i64>,
    ) -> TokenResult<String> {
        let keys = self.keys.resolve()?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.validate_exp = false;

        let data: TokenData<LegacyClaims> =
            decode(token, &keys.decoding, &validation).map_err(Self::map_decode_error)?;
        let claims = data.claims;

        let days_since_expiry = (Utc::now().timestamp() - claims.exp) / 86_400;
        if days_since_expiry > self.config.legacy_grace_days {
            tracing::warn!(
                email = %claims.email,
                days_since_expiry,
                max = self.config.legacy_grace_days,
                "Legacy token refresh denied, expired too long ago"
            );
            return Err(TokenError::TokenTooOldToRefresh { days_since_expiry });
        }

        self.issue_legacy_token(
            &claims.email,
            &claims.name,
            &claims.project_id,
            expiry_days,
            claims.custom,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> &'static str {
        "test-secret-key-for-jwt-signing-minimum-32-chars"
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::with_secret(test_secret())
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let token = issuer
            .issue_access_token(
                "yamada@i-seifu.jp",
                Some("Yamada"),
                "portal",
                Some("office"),
                None,
            )
            .unwrap();

        let claims = issuer.verify_access_token(&token).unwrap();
        assert_eq!(claims.email, "yamada@i-seifu.jp");
        assert_eq!(claims.sub, "yamada@i-seifu.jp");
        assert_eq!(claims.name.as_deref(), Some("Yamada"));
        assert_eq!(claims.project_id, "portal");
        assert_eq!(claims.role.as_deref(), Some("office"));
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_refresh_tokens_get_distinct_jtis() {
        let issuer = issuer();
        let a = issuer.issue_refresh_token("a@x.jp", "portal", 30).unwrap();
        let b = issuer.issue_refresh_token("a@x.jp", "portal", 30).unwrap();

        let a = issuer.verify_refresh_token(&a).unwrap();
        let b = issuer.verify_refresh_token(&b).unwrap();
        assert_eq!(a.jti.len(), 32);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expired_access_token() {
        let issuer = issuer();

        // Expired two hours ago, well beyond validation leeway
        let token = issuer
            .issue_access_token("a@x.jp", Some("A"), "portal", None, Some(-7200))
            .unwrap();
        assert!(matches!(
            issuer.verify_access_token(&token),
            Err(TokenError::TokenExpired)
        ));
    }

    #[test]
    fn test_access_ttl_override() {
        let issuer = issuer();

        let token = issuer
            .issue_access_token("a@x.jp", None, "portal", None, Some(600))
            .unwrap();
        let claims = issuer.verify_access_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 600);

        // None falls back to the configured default
        let token = issuer
            .issue_access_token("a@x.jp", None, "portal", None, None)
            .unwrap();
        let claims = issuer.verify_access_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let issuer = issuer();
        let token = issuer
            .issue_access_token("a@x.jp", Some("A"), "portal", None, None)
            .unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });

        assert!(matches!(
            issuer.verify_access_token(&tampered),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = issuer()
            .issue_access_token("a@x.jp", Some("A"), "portal", None, None)
            .unwrap();

        let other = TokenIssuer::with_secret("an-entirely-different-signing-secret!");
        assert!(matches!(
            other.verify_access_token(&token),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let issuer = issuer();
        let access = issuer
            .issue_access_token("a@x.jp", Some("A"), "portal", None, None)
            .unwrap();
        let refresh = issuer.issue_refresh_token("a@x.jp", "portal", 30).unwrap();

        // Access token has no jti; refresh token has no iss
        assert!(issuer.verify_refresh_token(&access).is_err());
        assert!(issuer.verify_access_token(&refresh).is_err());
    }

    #[test]
    fn test_legacy_refresh_preserves_custom_claims() {
        let issuer = issuer();
        let mut custom = HashMap::new();
        custom.insert("role".to_string(), serde_json::json!("office"));
        custom.insert(
            "picture".to_string(),
            serde_json::json!("https://example.com/a.png"),
        );

        let token = issuer
            .issue_legacy_token("a@x.jp", "A", "portal", Some(7), custom)
            .unwrap();
        let refreshed = issuer.refresh_legacy_token(&token, Some(14)).unwrap();

        let claims = issuer.verify_legacy_token(&refreshed).unwrap();
        assert_eq!(claims.custom["role"], "office");
        assert_eq!(claims.custom["picture"], "https://example.com/a.png");
        assert_eq!(claims.name, "A");
    }

    #[test]
    fn test_legacy_refresh_grace_window() {
        let issuer = issuer();

        // Expired 3 days ago, inside the 7-day grace window
        let token = issuer
            .issue_legacy_token("a@x.jp", "A", "portal", Some(-3), HashMap::new())
            .unwrap();
        assert!(issuer.refresh_legacy_token(&token, None).is_ok());

        // Expired 30 days ago, outside the window
        let token = issuer
            .issue_legacy_token("a@x.jp", "A", "portal", Some(-30), HashMap::new())
            .unwrap();
        assert!(matches!(
            issuer.refresh_legacy_token(&token, None),
            Err(TokenError::TokenTooOldToRefresh { .. })
        ));
    }

    #[test]
    fn test_issue_pair() {
        let issuer = issuer();
        let pair = issuer
            .issue_pair("a@x.jp", Some("A"), "portal", Some("office"), None, 30)
            .unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);

        let access = issuer.verify_access_token(&pair.access_token).unwrap();
        let refresh = issuer.verify_refresh_token(&pair.refresh_token).unwrap();
        assert_eq!(access.role.as_deref(), Some("office"));
        assert_eq!(refresh.project_id, "portal");

        let pair = issuer
            .issue_pair("a@x.jp", Some("A"), "portal", None, Some(600), 30)
            .unwrap();
        assert_eq!(pair.expires_in, 600);
    }

    #[test]
    fn test_missing_key_is_fatal() {
        struct NoKey;
        impl SigningKeySource for NoKey {
            fn load_key(&self) -> Option<String> {
                None
            }
        }

        let issuer = TokenIssuer::new(TokenConfig::default(), Arc::new(NoKey));
        assert!(matches!(
            issuer.issue_access_token("a@x.jp", None, "portal", None, None),
            Err(TokenError::SigningKeyUnavailable)
        ));
    }
}
