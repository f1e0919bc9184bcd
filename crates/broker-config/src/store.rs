//! Policy storage
//!
//! This module provides the lookup boundary between the broker core and
//! whatever holds project policies: a local map for development, a secret
//! store or document store in production. Only the in-memory store lives
//! here; external backends implement the same trait elsewhere.

use crate::error::{ConfigError, ConfigResult};
use crate::policy::ProjectPolicy;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Lookup boundary for project policies.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the policy for a project.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProjectNotFound`] when no policy is registered
    /// under `project_id`.
    async fn get_project_policy(&self, project_id: &str) -> ConfigResult<ProjectPolicy>;
}

/// In-memory policy store.
///
/// Suitable for development and tests. Policies are validated on insert so
/// a malformed configuration fails at load time, not at first login.
#[derive(Default)]
pub struct MemoryConfigStore {
    policies: RwLock<HashMap<String, ProjectPolicy>>,
}

impl MemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy, replacing any previous policy for the project.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPolicy`] when the policy fails
    /// validation; the store is left unchanged.
    pub async fn insert(&self, policy: ProjectPolicy) -> ConfigResult<()> {
        policy.validate()?;
        let project_id = policy.project_id.clone();
        self.policies.write().await.insert(project_id.clone(), policy);
        tracing::info!(project_id = %project_id, "Registered project policy");
        Ok(())
    }

    /// Remove a project's policy. Returns true when a policy was removed.
    pub async fn remove(&self, project_id: &str) -> bool {
        let removed = self.policies.write().await.remove(project_id).is_some();
        if removed {
            tracing::info!(project_id = %project_id, "Removed project policy");
        }
        removed
    }

    /// List the registered project ids.
    pub async fn project_ids(&self) -> Vec<String> {
        self.policies.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get_project_policy(&self, project_id: &str) -> ConfigResult<ProjectPolicy> {
        self.policies
            .read()
            .await
            .get(project_id)
            .cloned()
            .ok_or_else(|| ConfigError::ProjectNotFound(project_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(project_id: &str) -> ProjectPolicy {
        ProjectPolicy::new(
            project_id,
            vec!["example.com".to_string()],
            vec!["https://app.example.com/cb".to_string()],
        )
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = MemoryConfigStore::new();
        store.insert(policy("app")).await.unwrap();

        let found = store.get_project_policy("app").await.unwrap();
        assert_eq!(found.project_id, "app");
    }

    #[tokio::test]
    async fn test_missing_project() {
        let store = MemoryConfigStore::new();
        let err = store.get_project_policy("ghost").await.unwrap_err();
        assert!(matches!(err, ConfigError::ProjectNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_insert_validates() {
        let store = MemoryConfigStore::new();
        let mut bad = policy("app");
        bad.redirect_uris.clear();

        assert!(store.insert(bad).await.is_err());
        assert!(store.get_project_policy("app").await.is_err());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryConfigStore::new();
        store.insert(policy("app")).await.unwrap();

        assert!(store.remove("app").await);
        assert!(!store.remove("app").await);
        assert!(store.project_ids().await.is_empty());
    }
}
