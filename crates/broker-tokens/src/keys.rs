//! Signing key material
//!
//! The HMAC secret may come from a static configuration value or from a
//! lazily-loaded external secret store. The issuer resolves the key once,
//! caches it, and treats an unresolvable key as a fatal configuration
//! error rather than a per-request failure.

use crate::error::{TokenError, TokenResult};
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::sync::Arc;
use std::sync::RwLock;

/// Source of the JWT signing secret.
///
/// Implementations may read configuration, a secret manager, or anything
/// else; `load_key` is called at most a handful of times because the
/// issuer caches the first successful result.
pub trait SigningKeySource: Send + Sync {
    /// Load the secret, or `None` when the source has nothing to offer.
    fn load_key(&self) -> Option<String>;
}

/// Key source backed by a static configuration value.
pub struct StaticKeySource {
    secret: String,
}

impl StaticKeySource {
    /// Create a source around a fixed secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl SigningKeySource for StaticKeySource {
    fn load_key(&self) -> Option<String> {
        if self.secret.is_empty() {
            None
        } else {
            Some(self.secret.clone())
        }
    }
}

/// Resolved encoding/decoding key pair.
pub(crate) struct KeyMaterial {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

/// Lazily-resolving, caching wrapper around a [`SigningKeySource`].
pub(crate) struct KeyCache {
    source: Arc<dyn SigningKeySource>,
    cached: RwLock<Option<Arc<KeyMaterial>>>,
}

impl KeyCache {
    pub fn new(source: Arc<dyn SigningKeySource>) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    /// Get the key material, loading and caching it on first use.
    ///
    /// # Errors
    ///
    /// [`TokenError::SigningKeyUnavailable`] when the source yields no key.
    pub fn resolve(&self) -> TokenResult<Arc<KeyMaterial>> {
        if let Some(material) = self.cached.read().expect("key cache poisoned").as_ref() {
            return Ok(Arc::clone(material));
        }

        let mut guard = self.cached.write().expect("key cache poisoned");
        // Another thread may have resolved while we waited for the lock
        if let Some(material) = guard.as_ref() {
            return Ok(Arc::clone(material));
        }

        let secret = self.source.load_key().ok_or_else(|| {
            tracing::error!("No signing key available from any configured source");
            TokenError::SigningKeyUnavailable
        })?;

        let material = Arc::new(KeyMaterial {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        });
        *guard = Some(Arc::clone(&material));
        tracing::info!("JWT signing key resolved and cached");
        Ok(material)
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("cached", &"[REDACTED]")
            .finish()
    }
}
