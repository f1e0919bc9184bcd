//! Authenticated identity
//!
//! The identity provider (Google OAuth behind the broker's callback
//! endpoint) is a black box to this crate: it exchanges an authorization
//! code and hands back verified identity claims. The [`Identity`] struct
//! is immutable for the duration of one authorization attempt.

use crate::error::AuthResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An authenticated identity, optionally enriched with directory data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Verified email address
    pub email: String,

    /// Display name from the identity provider
    pub display_name: String,

    /// Profile picture URL, when the provider supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Directory groups, `None` when no lookup was performed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_groups: Option<Vec<String>>,

    /// Org-unit path, `None` when no lookup was performed or it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_unit_path: Option<String>,
}

impl Identity {
    /// Create an identity with no directory attributes.
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
            picture: None,
            directory_groups: None,
            org_unit_path: None,
        }
    }

    /// Set the profile picture.
    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }

    /// Set the directory groups.
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.directory_groups = Some(groups);
        self
    }

    /// Set the org-unit path.
    pub fn with_org_unit(mut self, org_unit_path: impl Into<String>) -> Self {
        self.org_unit_path = Some(org_unit_path.into());
        self
    }
}

/// Black-box boundary to the external OAuth identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code for verified identity claims.
    ///
    /// # Errors
    ///
    /// [`AuthError::OAuthExchangeFailed`] when the provider rejects the
    /// code or the exchange cannot complete.
    ///
    /// [`AuthError::OAuthExchangeFailed`]: crate::error::AuthError::OAuthExchangeFailed
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> AuthResult<Identity>;
}
