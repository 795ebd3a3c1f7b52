//! Common test infrastructure for cache integration tests.

#![allow(dead_code)]

use pulse_cache::{CacheService, CacheSettings, MemoryConnector, MemoryStore};
use pulse_config::RedisConfig;
use pulse_resilience::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::{Redis, REDIS_PORT};

/// Settings with a short reconnect backoff so outage tests finish quickly.
pub fn fast_settings(prefix: &str) -> CacheSettings {
    CacheSettings {
        key_prefix: prefix.to_string(),
        reconnect: RetryPolicy::reconnect(3, Duration::from_millis(10), Duration::from_millis(40)),
        ..CacheSettings::default()
    }
}

/// A cache service over a shared in-memory store.
pub struct MemoryCache {
    pub store: Arc<MemoryStore>,
    pub cache: CacheService,
}

impl MemoryCache {
    /// Creates a connected service under the default `pulse:` prefix.
    pub async fn new() -> Self {
        Self::with_prefix("pulse:").await
    }

    /// Creates a connected service under `prefix`.
    pub async fn with_prefix(prefix: &str) -> Self {
        Self::sharing(Arc::new(MemoryStore::new()), prefix).await
    }

    /// Creates a connected service over an existing store.
    pub async fn sharing(store: Arc<MemoryStore>, prefix: &str) -> Self {
        let connector = MemoryConnector::new(Arc::clone(&store));
        let cache = CacheService::with_connector(Arc::new(connector), fast_settings(prefix));
        assert!(cache.ready().await, "memory cache failed to connect");

        Self { store, cache }
    }
}

/// Redis testcontainer wrapper.
///
/// Requires Docker to be available on the system.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    url: String,
}

impl TestRedis {
    /// Starts a fresh Redis container.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(REDIS_PORT)
            .await
            .expect("Failed to get Redis port");

        Self {
            _container: container,
            url: format!("redis://127.0.0.1:{}", port),
        }
    }

    /// Connection URL of the container.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Cache configuration pointing at the container.
    pub fn config(&self, prefix: &str) -> RedisConfig {
        RedisConfig {
            key_prefix: prefix.to_string(),
            ..RedisConfig::with_url(self.url.clone())
        }
    }
}
