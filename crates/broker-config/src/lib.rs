//! # Broker Configuration
//!
//! Per-project access policy for the unified auth broker.
//!
//! ## Overview
//!
//! Each registered client application ("project") carries a
//! [`ProjectPolicy`]: which email domains may sign in, whether student
//! accounts are allowed, admin/group/org-unit restrictions, redirect
//! targets, token delivery and lifetimes, and optional [`RoleRule`]s for
//! deriving a role label.
//!
//! Policies are strongly typed and validated when loaded; a malformed
//! configuration fails at startup, not at first login. The [`ConfigStore`]
//! trait is the seam between the broker core and the backing store; this
//! crate ships the in-memory implementation used for development and tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use broker_config::{MemoryConfigStore, ProjectPolicy};
//!
//! # async fn example() -> Result<(), broker_config::ConfigError> {
//! let store = MemoryConfigStore::new();
//! store
//!     .insert(ProjectPolicy::new(
//!         "seifu-portal",
//!         vec!["i-seifu.jp".to_string()],
//!         vec!["https://portal.example.com/auth".to_string()],
//!     ))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod policy;
pub mod rules;
pub mod store;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use policy::{validate_redirect_uri, ProjectPolicy, TokenDelivery};
pub use rules::{RoleCondition, RoleRule};
pub use store::{ConfigStore, MemoryConfigStore};
