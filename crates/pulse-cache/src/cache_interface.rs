//! Cache interface trait for abstracted caching operations.

use crate::options::CacheOptions;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tracing::{error, warn};

/// Cache interface for storing and retrieving cached data.
///
/// Every operation is fail-open: store failures are logged and the
/// documented default is returned, so callers never see an error from the
/// cache layer.
///
/// Uses JSON strings for type-erased storage to maintain dyn-compatibility.
#[async_trait]
pub trait CacheInterface: Send + Sync {
    /// Get a raw JSON value from the cache.
    ///
    /// Returns `None` on a miss, on failure, or when not connected.
    async fn get_raw(&self, key: &str) -> Option<String>;

    /// Store a raw JSON value and index it under the option's tags.
    async fn set_raw(&self, key: &str, value: &str, options: &CacheOptions);

    /// Delete a value from the cache.
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &str) -> bool;

    /// Delete every key matching a glob (relative to the key prefix).
    ///
    /// Returns the number of keys deleted.
    async fn delete_by_pattern(&self, pattern: &str) -> u64;

    /// Delete every entry indexed under `tag`, then the tag itself.
    ///
    /// Returns the number of entries deleted.
    async fn invalidate_by_tag(&self, tag: &str) -> u64;

    /// Check if a key exists in the cache.
    async fn exists(&self, key: &str) -> bool;

    /// Remaining time-to-live in seconds.
    ///
    /// `-1` if the key is absent, has no expiry, or the cache is not connected.
    async fn get_ttl(&self, key: &str) -> i64;

    /// Atomically add `by` to an integer counter (absent counters start at 0).
    ///
    /// Returns the new value, or `0` when not connected.
    async fn increment(&self, key: &str, by: i64) -> i64;

    /// Delete every key under this cache's prefix.
    async fn clear(&self) -> u64;

    /// Check if the backing store is currently connected.
    fn is_connected(&self) -> bool;
}

/// Extension trait with typed methods for convenience.
///
/// This trait provides generic get/set methods that work with any serializable type.
#[async_trait]
pub trait CacheExt: CacheInterface {
    /// Get a typed value from the cache.
    ///
    /// A value that no longer decodes as `T` counts as a miss.
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        let json = self.get_raw(key).await?;

        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Set a typed value in the cache.
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, options: &CacheOptions) {
        match serde_json::to_string(value) {
            Ok(json) => self.set_raw(key, &json, options).await,
            Err(e) => error!(key = key, error = %e, "Failed to serialize cache value"),
        }
    }

    /// Get a value or compute and cache it if not present.
    ///
    /// The factory runs at most once, and only on a miss. Its error is
    /// returned unchanged and nothing is cached.
    async fn get_or_set<T, E, F, Fut>(&self, key: &str, factory: F, options: &CacheOptions) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        let value = factory().await?;
        self.set(key, &value, options).await;

        Ok(value)
    }
}

// Blanket implementation for all CacheInterface implementations
impl<T: CacheInterface + ?Sized> CacheExt for T {}
