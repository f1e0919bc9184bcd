//! Used refresh-token tracking
//!
//! Refresh tokens are single-use: the first redemption of a `jti` records
//! it here, and any later redemption of the same `jti` is a replay. The
//! [`UsedTokenStore`] trait is the seam for externalizing the store when a
//! deployment runs more than one broker instance; the in-memory
//! implementation covers a single process.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Record of a consumed refresh token.
///
/// Created exactly once per redemption, never mutated, purged by the
/// retention sweep. Its presence for a given `jti` is the single source of
/// truth for "already consumed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsedTokenRecord {
    /// The consumed token's unique id
    pub jti: String,

    /// User the token belonged to
    pub email: String,

    /// Project the token was issued for
    pub project_id: String,

    /// When the token was redeemed
    pub used_at: DateTime<Utc>,

    /// Client address that redeemed it, when known
    pub ip_address: Option<String>,
}

impl UsedTokenRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        jti: impl Into<String>,
        email: impl Into<String>,
        project_id: impl Into<String>,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            jti: jti.into(),
            email: email.into(),
            project_id: project_id.into(),
            used_at: Utc::now(),
            ip_address,
        }
    }
}

/// Store of consumed refresh-token ids.
#[async_trait]
pub trait UsedTokenStore: Send + Sync {
    /// Whether a `jti` has already been consumed.
    async fn is_used(&self, jti: &str) -> bool;

    /// Record a `jti` as consumed.
    ///
    /// Not idempotent: callers must check first (or use [`claim`]);
    /// marking the same `jti` twice is a caller bug.
    ///
    /// [`claim`]: UsedTokenStore::claim
    async fn mark_used(&self, record: UsedTokenRecord);

    /// Atomically check-and-mark a `jti`.
    ///
    /// Returns `true` when this call consumed the token, `false` when it
    /// was already used. Of two racing claims for the same `jti`, exactly
    /// one returns `true`.
    async fn claim(&self, record: UsedTokenRecord) -> bool;

    /// Purge records older than `max_age_days`. Returns the number purged.
    ///
    /// Meant to run on a timer, not on the request path.
    async fn cleanup_expired(&self, max_age_days: i64) -> usize;
}

/// Default retention for used-token records, one day past the longest
/// refresh TTL.
pub const DEFAULT_USED_TOKEN_RETENTION_DAYS: i64 = 31;

/// In-memory used-token store.
///
/// All operations share one mutex, so check-and-mark is race-free within
/// the process. Cross-instance deployments must implement
/// [`UsedTokenStore`] over an external store instead.
#[derive(Default)]
pub struct MemoryUsedTokenStore {
    records: Mutex<HashMap<String, UsedTokenRecord>>,
}

impl MemoryUsedTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl UsedTokenStore for MemoryUsedTokenStore {
    async fn is_used(&self, jti: &str) -> bool {
        self.records.lock().await.contains_key(jti)
    }

    async fn mark_used(&self, record: UsedTokenRecord) {
        tracing::info!(jti = %record.jti, email = %record.email, project_id = %record.project_id,
            "Marked refresh token as used");
        self.records.lock().await.insert(record.jti.clone(), record);
    }

    async fn claim(&self, record: UsedTokenRecord) -> bool {
        let mut records = self.records.lock().await;
        match records.entry(record.jti.clone()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                tracing::info!(jti = %record.jti, email = %record.email,
                    project_id = %record.project_id, "Marked refresh token as used");
                slot.insert(record);
                true
            }
        }
    }

    async fn cleanup_expired(&self, max_age_days: i64) -> usize {
        let cutoff = Utc::now() - Duration::days(max_age_days);
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| record.used_at > cutoff);
        let removed = before - records.len();
        if removed > 0 {
            tracing::info!(removed, max_age_days, "Cleaned up expired used-token records");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(jti: &str) -> UsedTokenRecord {
        UsedTokenRecord::new(jti, "a@x.jp", "portal", None)
    }

    #[tokio::test]
    async fn test_claim_consumes_once() {
        let store = MemoryUsedTokenStore::new();

        assert!(!store.is_used("j1").await);
        assert!(store.claim(record("j1")).await);
        assert!(store.is_used("j1").await);
        assert!(!store.claim(record("j1")).await);
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let store = Arc::new(MemoryUsedTokenStore::new());

        let a = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.claim(record("race")).await }
        });
        let b = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.claim(record("race")).await }
        });

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a ^ b, "exactly one claim must win");
    }

    #[tokio::test]
    async fn test_cleanup_purges_only_old_records() {
        let store = MemoryUsedTokenStore::new();

        let mut old = record("old");
        old.used_at = Utc::now() - Duration::days(40);
        store.mark_used(old).await;
        store.mark_used(record("fresh")).await;

        let removed = store
            .cleanup_expired(DEFAULT_USED_TOKEN_RETENTION_DAYS)
            .await;
        assert_eq!(removed, 1);
        assert!(!store.is_used("old").await);
        assert!(store.is_used("fresh").await);
    }

    #[tokio::test]
    async fn test_mark_used_records_metadata() {
        let store = MemoryUsedTokenStore::new();
        store
            .mark_used(UsedTokenRecord::new(
                "j2",
                "b@x.jp",
                "portal",
                Some("203.0.113.7".to_string()),
            ))
            .await;

        assert!(store.is_used("j2").await);
        assert_eq!(store.len().await, 1);
    }
}
