//! # Broker Auth
//!
//! Authorization pipeline for the unified auth broker.
//!
//! ## Overview
//!
//! This crate ties the lower layers together into the broker's two flows:
//!
//! - **Login**: an [`IdentityProvider`] exchanges the OAuth authorization
//!   code for a verified [`Identity`]; [`AuthPipeline::authorize`] loads
//!   the project's policy, enriches the identity with directory data when
//!   the policy needs it, evaluates the policy, resolves a role, and
//!   mints tokens under the configured [`TokenScheme`].
//! - **Refresh**: [`AuthPipeline::refresh`] rotates a single-use refresh
//!   token into a fresh pair, consuming its `jti` atomically so a
//!   replayed token is rejected and audited as a security event.
//!
//! Collaborators sit behind traits ([`IdentityProvider`],
//! [`DirectoryClient`], plus the config, used-token, and audit traits
//! from the lower crates), so hosting code chooses the real Google
//! backends while tests substitute stubs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use broker_audit::TracingAuditSink;
//! use broker_auth::{AuthPipeline, Identity, RequestContext};
//! use broker_config::MemoryConfigStore;
//! use broker_tokens::{MemoryUsedTokenStore, TokenIssuer};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), broker_auth::AuthError> {
//! let pipeline = AuthPipeline::new(
//!     Arc::new(MemoryConfigStore::new()),
//!     Arc::new(TokenIssuer::with_secret("your-signing-secret")),
//!     Arc::new(MemoryUsedTokenStore::new()),
//!     Arc::new(TracingAuditSink::new()),
//! );
//!
//! let identity = Identity::new("yamada@i-seifu.jp", "Yamada");
//! let grant = pipeline
//!     .authorize(&identity, "portal", &RequestContext::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod directory;
pub mod error;
pub mod identity;
pub mod pipeline;

// Re-export main types
pub use directory::{expand_transitive_groups, DirectoryClient, MAX_GROUP_EXPANSION_LOOKUPS};
pub use error::{AuthError, AuthResult};
pub use identity::{Identity, IdentityProvider};
pub use pipeline::{AuthGrant, AuthPipeline, IssuedTokens, RequestContext, TokenScheme};
