//! Project policy
//!
//! This module defines the per-project access policy: domain allow-list,
//! student/admin restrictions, group and org-unit requirements, redirect
//! targets, token delivery and lifetimes, and optional role rules.
//!
//! Policies are validated at load time (fail fast on structural problems)
//! rather than accessed field-by-field at use time.

use crate::error::ConfigError;
use crate::rules::RoleRule;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How the issued token is delivered back to the client application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenDelivery {
    /// Token appended to the redirect URI as a `token` query parameter
    #[default]
    QueryParam,
    /// Token set as an HttpOnly cookie on the redirect response
    Cookie,
}

fn default_access_token_ttl_secs() -> i64 {
    3600
}

fn default_refresh_token_ttl_days() -> i64 {
    30
}

fn default_student_allowed() -> bool {
    true
}

/// Per-project access policy.
///
/// Loaded by a [`ConfigStore`](crate::store::ConfigStore) implementation and
/// read-only for the duration of one authorization attempt.
///
/// Empty restriction lists mean "no restriction of that kind": an empty
/// `admin_emails` is an open policy, empty group lists skip the group check,
/// and so on. `allowed_domains` and `redirect_uris` must be non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectPolicy {
    /// Project identifier, unique across the broker
    pub project_id: String,

    /// Human-readable project name
    #[serde(default)]
    pub name: String,

    /// Email domains allowed to sign in (exact match, no subdomains)
    pub allowed_domains: Vec<String>,

    /// Whether student accounts may use this project
    #[serde(default = "default_student_allowed")]
    pub student_allowed: bool,

    /// When non-empty, restricts access to exactly these addresses
    #[serde(default)]
    pub admin_emails: Vec<String>,

    /// Groups the user must belong to, all of them (AND)
    #[serde(default)]
    pub required_groups: Vec<String>,

    /// Groups of which the user must belong to at least one (OR)
    #[serde(default)]
    pub allowed_groups: Vec<String>,

    /// Org units the user's org unit must fall under, all of them (AND)
    #[serde(default)]
    pub required_org_units: Vec<String>,

    /// Org units of which at least one must cover the user's org unit (OR)
    #[serde(default)]
    pub allowed_org_units: Vec<String>,

    /// Redirect URIs the client may request after login
    pub redirect_uris: Vec<String>,

    /// Token delivery mechanism
    #[serde(default)]
    pub token_delivery: TokenDelivery,

    /// Access token lifetime in seconds
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: i64,

    /// Refresh token lifetime in days
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,

    /// Ordered role derivation rules, first match wins
    #[serde(default)]
    pub role_rules: Vec<RoleRule>,
}

impl ProjectPolicy {
    /// Create a minimal valid policy for the given project and domain.
    pub fn new(
        project_id: impl Into<String>,
        allowed_domains: Vec<String>,
        redirect_uris: Vec<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            name: String::new(),
            allowed_domains,
            student_allowed: true,
            admin_emails: Vec::new(),
            required_groups: Vec::new(),
            allowed_groups: Vec::new(),
            required_org_units: Vec::new(),
            allowed_org_units: Vec::new(),
            redirect_uris,
            token_delivery: TokenDelivery::QueryParam,
            access_token_ttl_secs: default_access_token_ttl_secs(),
            refresh_token_ttl_days: default_refresh_token_ttl_days(),
            role_rules: Vec::new(),
        }
    }

    /// Validate the policy structure, failing fast on load-time errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPolicy`] when the project id, allowed
    /// domains, or redirect URIs are missing, a TTL is non-positive, or two
    /// role rules share a priority.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPolicy {
            project_id: self.project_id.clone(),
            reason: reason.to_string(),
        };

        if self.project_id.is_empty() {
            return Err(invalid("project_id must not be empty"));
        }
        if self.allowed_domains.is_empty() {
            return Err(invalid("allowed_domains must not be empty"));
        }
        if self.redirect_uris.is_empty() {
            return Err(invalid("redirect_uris must not be empty"));
        }
        if self.access_token_ttl_secs <= 0 {
            return Err(invalid("access_token_ttl_secs must be positive"));
        }
        if self.refresh_token_ttl_days <= 0 {
            return Err(invalid("refresh_token_ttl_days must be positive"));
        }

        let mut priorities = HashSet::new();
        for rule in &self.role_rules {
            if !priorities.insert(rule.priority) {
                return Err(invalid(&format!(
                    "duplicate role rule priority: {}",
                    rule.priority
                )));
            }
            if rule.role.is_empty() {
                return Err(invalid("role rule has an empty role label"));
            }
        }

        Ok(())
    }

    /// Whether evaluating this policy needs directory group data.
    ///
    /// True when group restrictions are configured or any role rule is a
    /// group-membership condition.
    pub fn wants_groups(&self) -> bool {
        !self.required_groups.is_empty()
            || !self.allowed_groups.is_empty()
            || self.role_rules.iter().any(|r| r.condition.needs_groups())
    }

    /// Whether evaluating this policy needs the user's org unit.
    pub fn wants_org_unit(&self) -> bool {
        !self.required_org_units.is_empty() || !self.allowed_org_units.is_empty()
    }

    /// Set the admin allow-list.
    pub fn with_admin_emails(mut self, emails: Vec<String>) -> Self {
        self.admin_emails = emails;
        self
    }

    /// Set whether student accounts are allowed.
    pub fn with_student_allowed(mut self, allowed: bool) -> Self {
        self.student_allowed = allowed;
        self
    }

    /// Set the role rules.
    pub fn with_role_rules(mut self, rules: Vec<RoleRule>) -> Self {
        self.role_rules = rules;
        self
    }
}

/// Validate a client-requested redirect URI against the policy's allow-list.
///
/// URIs are compared lowercased with trailing slashes trimmed. A URI is
/// accepted on exact match or when it is a subdirectory of an allowed URI.
pub fn validate_redirect_uri(redirect_uri: &str, allowed_uris: &[String]) -> bool {
    let requested = redirect_uri.to_lowercase();
    let requested = requested.trim_end_matches('/');

    allowed_uris.iter().any(|allowed| {
        let allowed = allowed.to_lowercase();
        let allowed = allowed.trim_end_matches('/');
        requested == allowed || requested.starts_with(&format!("{}/", allowed))
    })
}
