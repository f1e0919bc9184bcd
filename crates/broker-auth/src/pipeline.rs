//! Authorization pipeline
//!
//! This module wires the collaborators together: after the identity
//! provider has verified who the user is, [`AuthPipeline::authorize`]
//! decides whether that user may enter the requested project and mints
//! session tokens, and [`AuthPipeline::refresh`] rotates a refresh token
//! into a fresh pair. Every outcome, allowed or denied, lands in the
//! audit sink.

use crate::directory::{expand_transitive_groups, DirectoryClient};
use crate::error::{AuthError, AuthResult};
use crate::identity::Identity;
use broker_audit::{AuditEvent, AuditEventType, AuditSink};
use broker_config::{ConfigStore, ProjectPolicy};
use broker_policy::{evaluate_policy, extract_domain, is_student_email, resolve_role};
use broker_tokens::{TokenIssuer, TokenPair, UsedTokenRecord, UsedTokenStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Request metadata carried through for auditing.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Client IP address
    pub ip_address: Option<String>,

    /// Client user agent
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the client IP address.
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

/// Which token scheme a successful login produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenScheme {
    /// Short-lived access token plus rotating single-use refresh token
    #[default]
    RefreshPair,
    /// One long-lived token, refreshed in place (deprecated clients)
    LegacySingle,
}

/// Tokens minted for a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssuedTokens {
    /// Access/refresh pair
    Pair(TokenPair),
    /// Single legacy token
    Single {
        token: String,
        expires_in: i64,
    },
}

/// Outcome of a successful authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthGrant {
    /// Project the grant is scoped to
    pub project_id: String,

    /// Email of the granted identity
    pub email: String,

    /// Display name of the granted identity
    pub name: String,

    /// Resolved role, when the policy derives one
    pub role: Option<String>,

    /// The minted tokens
    pub tokens: IssuedTokens,
}

/// Orchestrates policy evaluation, role resolution, token issuance, and
/// auditing for one broker instance.
pub struct AuthPipeline {
    config: Arc<dyn ConfigStore>,
    directory: Option<Arc<dyn DirectoryClient>>,
    issuer: Arc<TokenIssuer>,
    used_tokens: Arc<dyn UsedTokenStore>,
    audit: Arc<dyn AuditSink>,
    scheme: TokenScheme,
}

impl AuthPipeline {
    /// Create a pipeline issuing access/refresh pairs.
    pub fn new(
        config: Arc<dyn ConfigStore>,
        issuer: Arc<TokenIssuer>,
        used_tokens: Arc<dyn UsedTokenStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            directory: None,
            issuer,
            used_tokens,
            audit,
            scheme: TokenScheme::RefreshPair,
        }
    }

    /// Attach a directory client for group and org-unit lookups.
    ///
    /// Without one, policies that want directory data evaluate against
    /// empty groups and no org unit.
    pub fn with_directory(mut self, directory: Arc<dyn DirectoryClient>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Select the token scheme.
    pub fn with_scheme(mut self, scheme: TokenScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Authorize a verified identity for a project and mint tokens.
    ///
    /// Directory lookups happen only when the policy needs them and the
    /// identity does not already carry the data. A policy denial is
    /// audited as a failed login before the error is returned.
    ///
    /// # Errors
    ///
    /// [`AuthError::Config`] when the project is unknown,
    /// [`AuthError::Policy`] when the identity fails the policy,
    /// [`AuthError::Token`] when signing fails.
    pub async fn authorize(
        &self,
        identity: &Identity,
        project_id: &str,
        ctx: &RequestContext,
    ) -> AuthResult<AuthGrant> {
        let policy = self.config.get_project_policy(project_id).await?;

        let identity = self.enrich(identity, &policy).await;
        let groups = identity.directory_groups.as_deref();
        let org_unit = identity.org_unit_path.as_deref();

        if let Err(violation) = evaluate_policy(&identity.email, groups, org_unit, &policy) {
            tracing::info!(
                email = %identity.email,
                project_id = %project_id,
                reason = %violation,
                "Login denied by policy"
            );
            self.record(
                AuditEventType::LoginFailed,
                project_id,
                &identity.email,
                json!({
                    "reason": serde_json::to_value(&violation)
                        .unwrap_or_else(|_| json!(violation.to_string())),
                    "domain": extract_domain(&identity.email),
                    "is_student": is_student_email(&identity.email),
                    "groups": groups,
                    "org_unit": org_unit,
                }),
                ctx,
            )
            .await;
            return Err(violation.into());
        }

        let role = resolve_role(&identity.email, groups, &policy.role_rules);

        let tokens = match self.scheme {
            TokenScheme::RefreshPair => IssuedTokens::Pair(self.issuer.issue_pair(
                &identity.email,
                Some(&identity.display_name),
                project_id,
                role.as_deref(),
                Some(policy.access_token_ttl_secs),
                policy.refresh_token_ttl_days,
            )?),
            TokenScheme::LegacySingle => {
                let mut custom = HashMap::new();
                if let Some(role) = &role {
                    custom.insert("role".to_string(), json!(role));
                }
                if let Some(picture) = &identity.picture {
                    custom.insert("picture".to_string(), json!(picture));
                }
                let token = self.issuer.issue_legacy_token(
                    &identity.email,
                    &identity.display_name,
                    project_id,
                    None,
                    custom,
                )?;
                IssuedTokens::Single {
                    token,
                    expires_in: self.issuer.config().legacy_expiry_days * 86_400,
                }
            }
        };

        tracing::info!(email = %identity.email, project_id = %project_id, role = ?role,
            "Login authorized");
        self.record(
            AuditEventType::LoginSuccess,
            project_id,
            &identity.email,
            json!({
                "domain": extract_domain(&identity.email),
                "is_student": is_student_email(&identity.email),
                "groups": groups,
                "org_unit": org_unit,
                "role": role,
            }),
            ctx,
        )
        .await;

        Ok(AuthGrant {
            project_id: project_id.to_string(),
            email: identity.email,
            name: identity.display_name,
            role,
            tokens,
        })
    }

    /// Rotate a refresh token into a fresh access/refresh pair.
    ///
    /// The presented token's `jti` is consumed atomically; a second
    /// redemption of the same `jti` is treated as a replay, audited as a
    /// security event, and rejected. Tokens minted here carry identity
    /// claims only, no display name or role.
    ///
    /// # Errors
    ///
    /// [`AuthError::Token`] for an expired or malformed token,
    /// [`AuthError::Config`] when the token's project no longer exists,
    /// [`AuthError::RefreshTokenReused`] on replay.
    pub async fn refresh(&self, refresh_token: &str, ctx: &RequestContext) -> AuthResult<TokenPair> {
        let claims = self.issuer.verify_refresh_token(refresh_token)?;

        // Resolve the policy before consuming the jti so a transient
        // config failure does not burn a valid token.
        let policy = self.config.get_project_policy(&claims.project_id).await?;

        let record = UsedTokenRecord::new(
            claims.jti.clone(),
            claims.email.clone(),
            claims.project_id.clone(),
            ctx.ip_address.clone(),
        );
        if !self.used_tokens.claim(record).await {
            tracing::warn!(
                jti = %claims.jti,
                email = %claims.email,
                project_id = %claims.project_id,
                "Refresh token replay detected"
            );
            self.record(
                AuditEventType::RefreshReuseDetected,
                &claims.project_id,
                &claims.email,
                json!({ "jti": claims.jti }),
                ctx,
            )
            .await;
            return Err(AuthError::RefreshTokenReused { jti: claims.jti });
        }

        let pair = self.issuer.issue_pair(
            &claims.email,
            None,
            &claims.project_id,
            None,
            Some(policy.access_token_ttl_secs),
            policy.refresh_token_ttl_days,
        )?;

        tracing::info!(email = %claims.email, project_id = %claims.project_id,
            "Refresh token rotated");
        self.record(
            AuditEventType::TokenRefreshed,
            &claims.project_id,
            &claims.email,
            json!({ "rotated_jti": claims.jti }),
            ctx,
        )
        .await;

        Ok(pair)
    }

    /// Refresh a legacy single token in place.
    pub async fn refresh_legacy(
        &self,
        token: &str,
        expiry_days: Option<i64>,
        ctx: &RequestContext,
    ) -> AuthResult<String> {
        let refreshed = self.issuer.refresh_legacy_token(token, expiry_days)?;
        let claims = self.issuer.verify_legacy_token(&refreshed)?;

        self.record(
            AuditEventType::TokenRefreshed,
            &claims.project_id,
            &claims.email,
            json!({ "scheme": "legacy" }),
            ctx,
        )
        .await;

        Ok(refreshed)
    }

    /// Record a logout for auditing. Token invalidation is client-side.
    pub async fn logout(&self, project_id: &str, email: &str, ctx: &RequestContext) {
        self.record(
            AuditEventType::Logout,
            project_id,
            email,
            json!({}),
            ctx,
        )
        .await;
    }

    /// Fill in directory attributes the policy needs and the identity
    /// does not already carry. Lookup failures degrade to empty groups
    /// and no org unit.
    async fn enrich(&self, identity: &Identity, policy: &ProjectPolicy) -> Identity {
        let mut identity = identity.clone();

        if let Some(directory) = &self.directory {
            if policy.wants_groups() && identity.directory_groups.is_none() {
                let groups = expand_transitive_groups(directory.as_ref(), &identity.email).await;
                identity.directory_groups = Some(groups);
            }
            if policy.wants_org_unit() && identity.org_unit_path.is_none() {
                identity.org_unit_path = directory.org_unit(&identity.email).await;
            }
        } else if policy.wants_groups() && identity.directory_groups.is_none() {
            identity.directory_groups = Some(Vec::new());
        }

        identity
    }

    async fn record(
        &self,
        event_type: AuditEventType,
        project_id: &str,
        email: &str,
        details: serde_json::Value,
        ctx: &RequestContext,
    ) {
        let mut event = AuditEvent::new(event_type, project_id, email, details);
        if let Some(ip) = &ctx.ip_address {
            event = event.with_ip_address(ip.clone());
        }
        if let Some(ua) = &ctx.user_agent {
            event = event.with_user_agent(ua.clone());
        }
        self.audit.record(event).await;
    }
}

impl std::fmt::Debug for AuthPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthPipeline")
            .field("scheme", &self.scheme)
            .field("has_directory", &self.directory.is_some())
            .finish()
    }
}
