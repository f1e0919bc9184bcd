//! # Broker Tokens
//!
//! Session-token lifecycle for the unified auth broker.
//!
//! ## Overview
//!
//! - **Issuance**: short-lived access tokens and rotating, single-use
//!   refresh tokens via [`TokenIssuer`]; a deprecated legacy single-token
//!   mode (refresh-in-place with a grace window) kept for older clients.
//! - **Verification**: strict issuer checking for access tokens, distinct
//!   claim shapes so the two kinds are not interchangeable.
//! - **Reuse detection**: the [`UsedTokenStore`] tracks consumed refresh
//!   `jti`s with an atomic check-and-mark so a replayed token loses the
//!   race exactly once.
//! - **Key material**: a [`SigningKeySource`] resolved lazily and cached;
//!   a missing key is a fatal configuration error.
//! - **Proxy signing**: the HMAC-SHA256 request signature scheme used when
//!   forwarding API calls downstream on the user's behalf.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use broker_tokens::TokenIssuer;
//!
//! let issuer = TokenIssuer::with_secret("your-signing-secret");
//!
//! let pair = issuer
//!     .issue_pair("yamada@i-seifu.jp", Some("Yamada"), "portal", Some("office"), None, 30)
//!     .unwrap();
//! let claims = issuer.verify_access_token(&pair.access_token).unwrap();
//! assert_eq!(claims.role.as_deref(), Some("office"));
//! ```

pub mod claims;
pub mod error;
pub mod issuer;
pub mod keys;
pub mod signer;
pub mod store;

// Re-export main types
pub use claims::{AccessClaims, LegacyClaims, RefreshClaims, TOKEN_ISSUER};
pub use error::{TokenError, TokenResult};
pub use issuer::{TokenConfig, TokenIssuer, TokenPair};
pub use keys::{SigningKeySource, StaticKeySource};
pub use signer::{
    canonical_json, current_timestamp, generate_signature, generate_simple_signature,
    signed_headers, verify_signature,
};
pub use store::{
    MemoryUsedTokenStore, UsedTokenRecord, UsedTokenStore, DEFAULT_USED_TOKEN_RETENTION_DAYS,
};
