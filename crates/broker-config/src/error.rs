//! Error types for policy configuration

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No policy is registered for the requested project
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    /// A policy failed load-time validation
    #[error("Invalid policy for project '{project_id}': {reason}")]
    InvalidPolicy {
        /// Project the rejected policy belongs to
        project_id: String,
        /// What failed validation
        reason: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
