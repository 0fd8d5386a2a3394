// Cache backends.
// A shared Redis store, an in-process fallback, and the startup selection between them.

pub mod key;
pub mod shared;
pub mod store;

pub use key::CacheKey;
pub use shared::SharedStore;
pub use store::{CacheEntry, LocalStore};

use std::time::Duration;

use crate::config::SharedStoreConfig;
use crate::error::Result;

/// The backend chosen at startup.
///
/// Both variants expose the same operations, so callers never branch on
/// which one is active. The choice is made once by [`CacheBackend::connect`]
/// and is not revisited.
#[derive(Debug, Clone)]
pub enum CacheBackend {
    /// Redis, shared by every process instance.
    Shared(SharedStore),
    /// In-process fallback.
    Local(LocalStore),
}

impl CacheBackend {
    /// Probe the shared store once; fall back to a local store if it is
    /// disabled or unreachable.
    pub async fn connect(config: &SharedStoreConfig) -> Self {
        if !config.enabled {
            tracing::info!("Shared cache disabled, using local cache");
            return Self::new_local();
        }

        tracing::info!(url = %config.url, "Connecting to shared cache");

        match SharedStore::connect(&config.url, config.probe_timeout()).await {
            Ok(store) => {
                tracing::info!(url = %config.url, "Connected to shared cache");
                CacheBackend::Shared(store)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Shared cache unreachable. Falling back to local cache."
                );
                Self::new_local()
            }
        }
    }

    pub fn new_local() -> Self {
        CacheBackend::Local(LocalStore::new())
    }

    /// Live cached payload for `key`. Absence is not an error.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        match self {
            CacheBackend::Shared(store) => store.get(key).await,
            CacheBackend::Local(store) => Ok(store.get(key)),
        }
    }

    /// Store `value` for `key`, replacing any previous entry, live for `ttl`.
    pub async fn set_with_expiry(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()> {
        match self {
            CacheBackend::Shared(store) => store.set_with_expiry(key, value, ttl).await,
            CacheBackend::Local(store) => {
                store.set_with_expiry(key, value, ttl);
                Ok(())
            }
        }
    }

    /// Bump the request counter for `key`, returning the new count.
    pub async fn increment_counter(&self, key: &CacheKey) -> Result<u64> {
        match self {
            CacheBackend::Shared(store) => store.increment_counter(key).await,
            CacheBackend::Local(store) => Ok(store.increment_counter(key)),
        }
    }

    /// Requests observed for `key` so far.
    pub async fn request_count(&self, key: &CacheKey) -> Result<u64> {
        match self {
            CacheBackend::Shared(store) => store.request_count(key).await,
            CacheBackend::Local(store) => Ok(store.request_count(key)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CacheBackend::Shared(_) => "shared",
            CacheBackend::Local(_) => "local",
        }
    }
}
