//! Fail-open cache service.

use crate::cache_interface::CacheInterface;
use crate::connection::{ActiveStore, ConnectionSupervisor};
use crate::keys::KeyNamespace;
use crate::metrics::CacheMetrics;
use crate::options::{CacheOptions, DEFAULT_TTL};
use crate::store::{connector_for_url, CacheStore, StoreConnector};
use crate::{CacheError, CacheResult, ConnectionState};
use async_trait::async_trait;
use pulse_config::RedisConfig;
use pulse_resilience::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Default key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "pulse:";

/// Maximum keys per `DEL` when deleting in bulk.
const DELETE_BATCH: usize = 500;

/// Settings for a connected cache service.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Prefix applied to every key.
    pub key_prefix: String,
    /// TTL used when a write does not specify one.
    pub default_ttl: Duration,
    /// Backoff applied while (re)connecting.
    pub reconnect: RetryPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_ttl: DEFAULT_TTL,
            reconnect: RetryPolicy::reconnect(10, Duration::from_millis(100), Duration::from_secs(3)),
        }
    }
}

impl CacheSettings {
    /// Builds settings from the `[redis]` configuration section.
    pub fn from_config(config: &RedisConfig) -> Self {
        Self {
            key_prefix: config.key_prefix.clone(),
            default_ttl: config.default_ttl(),
            reconnect: RetryPolicy::reconnect(
                config.max_reconnect_attempts,
                config.reconnect_base_delay(),
                config.reconnect_max_delay(),
            ),
        }
    }
}

/// Best-effort caching facade over a key-value store.
///
/// Cheap to clone; clones share one connection. Construction never blocks
/// or fails: without a URL, or after reconnection gives up, the service is
/// `Disabled` and every operation returns its default.
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<Inner>,
}

struct Inner {
    keys: KeyNamespace,
    default_ttl: Duration,
    supervisor: Arc<ConnectionSupervisor>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.supervisor.abort_task();
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("prefix", &self.inner.keys.prefix())
            .field("state", &self.state())
            .finish()
    }
}

impl CacheService {
    /// Creates a service from configuration.
    ///
    /// Starts connecting in the background when a URL is configured.
    pub fn from_config(config: &RedisConfig) -> Self {
        let settings = CacheSettings::from_config(config);

        let Some(url) = config.url() else {
            warn!("No cache URL configured (REDIS_URL); caching disabled");
            return Self::disabled(settings.key_prefix);
        };

        match connector_for_url(url, config.connect_timeout()) {
            Ok(connector) => Self::with_connector(connector, settings),
            Err(e) => {
                error!(error = %e, "Invalid cache URL; caching disabled");
                Self::disabled(settings.key_prefix)
            }
        }
    }

    /// Creates a permanently disabled service.
    pub fn disabled(key_prefix: impl Into<String>) -> Self {
        Self::build(key_prefix.into(), DEFAULT_TTL, ConnectionState::Disabled)
    }

    /// Creates a service connecting through `connector`.
    pub fn with_connector(connector: Arc<dyn StoreConnector>, settings: CacheSettings) -> Self {
        let service = Self::build(settings.key_prefix, settings.default_ttl, ConnectionState::Disconnected);

        info!(target_store = %connector.describe(), "Connecting to cache store");
        service.inner.supervisor.spawn(connector, settings.reconnect);
        service
    }

    fn build(key_prefix: String, default_ttl: Duration, initial: ConnectionState) -> Self {
        let supervisor = ConnectionSupervisor::new(key_prefix.clone(), initial);
        Self {
            inner: Arc::new(Inner {
                keys: KeyNamespace::new(key_prefix),
                default_ttl,
                supervisor: Arc::new(supervisor),
            }),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.supervisor.state()
    }

    /// Waits for the connection cycle in progress to settle.
    ///
    /// Returns whether the service ended up connected.
    pub async fn ready(&self) -> bool {
        self.inner.supervisor.settled().await.is_connected()
    }

    /// The key namespace of this service.
    pub fn keys(&self) -> &KeyNamespace {
        &self.inner.keys
    }

    /// Stops reconnection and releases the connection. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.supervisor.abort_task();
        if self.inner.supervisor.on_closed() {
            info!("Cache service shut down");
        }
    }

    fn store(&self) -> Option<ActiveStore> {
        let store = self.inner.supervisor.current_store();
        if store.is_none() {
            trace!(state = %self.state(), "Cache not connected; skipping store");
        }
        store
    }

    fn handle_error(&self, store: &ActiveStore, operation: &'static str, key: &str, err: &CacheError) {
        CacheMetrics::error(operation);
        error!(operation, key = key, error = %err, "Cache operation failed");

        if err.is_connection_error() {
            self.inner.supervisor.on_transport_error(store.generation(), err);
        }
    }

    async fn delete_keys(store: &dyn CacheStore, keys: &[String]) -> CacheResult<u64> {
        let mut deleted = 0;
        for batch in keys.chunks(DELETE_BATCH) {
            deleted += store.del(batch).await?;
        }
        Ok(deleted)
    }

    async fn delete_matching(&self, operation: &'static str, pattern: &str) -> u64 {
        let Some(store) = self.store() else {
            return 0;
        };

        let result: CacheResult<u64> = async {
            let keys = store.scan_match(pattern).await?;
            Self::delete_keys(&*store, &keys).await
        }
        .await;

        match result {
            Ok(deleted) => {
                debug!(pattern = pattern, deleted, "Deleted keys matching pattern");
                deleted
            }
            Err(e) => {
                self.handle_error(&store, operation, pattern, &e);
                0
            }
        }
    }
}

#[async_trait]
impl CacheInterface for CacheService {
    async fn get_raw(&self, key: &str) -> Option<String> {
        let store = self.store()?;
        let full_key = self.inner.keys.key(key);

        match store.get(&full_key).await {
            Ok(Some(value)) => {
                CacheMetrics::hit();
                debug!(key = %full_key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                CacheMetrics::miss();
                debug!(key = %full_key, "Cache miss");
                None
            }
            Err(e) => {
                self.handle_error(&store, "get", &full_key, &e);
                None
            }
        }
    }

    async fn set_raw(&self, key: &str, value: &str, options: &CacheOptions) {
        let Some(store) = self.store() else {
            return;
        };
        let full_key = self.inner.keys.key(key);
        let ttl_secs = options.ttl_secs_or(self.inner.default_ttl);

        if let Err(e) = store.set_ex(&full_key, value, ttl_secs).await {
            self.handle_error(&store, "set", &full_key, &e);
            return;
        }

        for tag in &options.tags {
            let tag_key = self.inner.keys.tag(tag);
            if let Err(e) = store.sadd(&tag_key, &full_key).await {
                self.handle_error(&store, "tag", &tag_key, &e);
                return;
            }
        }

        debug!(key = %full_key, ttl_secs, tags = options.tags.len(), "Cached value");
    }

    async fn delete(&self, key: &str) -> bool {
        let Some(store) = self.store() else {
            return false;
        };
        let full_key = self.inner.keys.key(key);

        match store.del(std::slice::from_ref(&full_key)).await {
            Ok(deleted) => {
                debug!(key = %full_key, existed = deleted > 0, "Deleted key");
                deleted > 0
            }
            Err(e) => {
                self.handle_error(&store, "delete", &full_key, &e);
                false
            }
        }
    }

    async fn delete_by_pattern(&self, pattern: &str) -> u64 {
        let pattern = self.inner.keys.pattern(pattern);
        self.delete_matching("delete_by_pattern", &pattern).await
    }

    async fn invalidate_by_tag(&self, tag: &str) -> u64 {
        let Some(store) = self.store() else {
            return 0;
        };
        let tag_key = self.inner.keys.tag(tag);

        let result = async {
            let members = store.smembers(&tag_key).await?;
            // Members outside the prefix were not written by this service.
            let owned: Vec<String> = members
                .into_iter()
                .filter(|member| self.inner.keys.owns(member))
                .collect();

            let deleted = Self::delete_keys(&*store, &owned).await?;
            store.del(std::slice::from_ref(&tag_key)).await?;
            Ok::<_, CacheError>(deleted)
        }
        .await;

        match result {
            Ok(deleted) => {
                CacheMetrics::invalidation(deleted);
                debug!(tag = tag, deleted, "Invalidated tag");
                deleted
            }
            Err(e) => {
                self.handle_error(&store, "invalidate_by_tag", &tag_key, &e);
                0
            }
        }
    }

    async fn exists(&self, key: &str) -> bool {
        let Some(store) = self.store() else {
            return false;
        };
        let full_key = self.inner.keys.key(key);

        match store.exists(&full_key).await {
            Ok(exists) => exists,
            Err(e) => {
                self.handle_error(&store, "exists", &full_key, &e);
                false
            }
        }
    }

    async fn get_ttl(&self, key: &str) -> i64 {
        let Some(store) = self.store() else {
            return -1;
        };
        let full_key = self.inner.keys.key(key);

        match store.ttl(&full_key).await {
            // Absent (-2) and no-expiry (-1) both report -1.
            Ok(ttl) => ttl.max(-1),
            Err(e) => {
                self.handle_error(&store, "get_ttl", &full_key, &e);
                -1
            }
        }
    }

    async fn increment(&self, key: &str, by: i64) -> i64 {
        let Some(store) = self.store() else {
            return 0;
        };
        let full_key = self.inner.keys.key(key);

        match store.incr_by(&full_key, by).await {
            Ok(value) => value,
            Err(e) => {
                self.handle_error(&store, "increment", &full_key, &e);
                0
            }
        }
    }

    async fn clear(&self) -> u64 {
        let pattern = self.inner.keys.all();
        self.delete_matching("clear", &pattern).await
    }

    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_interface::CacheExt;
    use crate::store::{MockCacheStore, MockStoreConnector};
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn connected_to(store: MockCacheStore) -> MockStoreConnector {
        let store: Arc<dyn CacheStore> = Arc::new(store);
        let mut connector = MockStoreConnector::new();
        connector.expect_describe().return_const("mock://".to_string());
        connector.expect_connect().returning(move || Ok(Arc::clone(&store)));
        connector
    }

    async fn service_over(store: MockCacheStore) -> CacheService {
        let service = CacheService::with_connector(Arc::new(connected_to(store)), CacheSettings::default());
        assert!(service.ready().await);
        service
    }

    #[tokio::test]
    async fn test_disabled_returns_defaults() {
        let cache = CacheService::disabled("pulse:");

        assert_eq!(cache.state(), ConnectionState::Disabled);
        assert!(!cache.ready().await);
        assert!(!cache.is_connected());
        assert_eq!(cache.get::<String>("k").await, None);
        cache.set("k", &"v", &CacheOptions::new()).await;
        assert!(!cache.delete("k").await);
        assert!(!cache.exists("k").await);
        assert_eq!(cache.get_ttl("k").await, -1);
        assert_eq!(cache.increment("k", 1).await, 0);
        assert_eq!(cache.delete_by_pattern("*").await, 0);
        assert_eq!(cache.invalidate_by_tag("t").await, 0);
        assert_eq!(cache.clear().await, 0);
    }

    #[test]
    fn test_from_config_without_url_is_disabled() {
        let cache = CacheService::from_config(&RedisConfig::default());
        assert_eq!(cache.state(), ConnectionState::Disabled);
        assert_eq!(cache.keys().prefix(), "pulse:");
    }

    #[test]
    fn test_from_config_with_bad_url_is_disabled() {
        let cache = CacheService::from_config(&RedisConfig::with_url("ftp://cache"));
        assert_eq!(cache.state(), ConnectionState::Disabled);
    }

    #[tokio::test]
    async fn test_from_config_memory_url_connects() {
        let cache = CacheService::from_config(&RedisConfig::with_url("memory://"));
        assert!(cache.ready().await);

        cache.set("greeting", &"hello", &CacheOptions::new()).await;
        assert_eq!(cache.get::<String>("greeting").await, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn test_keys_are_prefixed() {
        let mut store = MockCacheStore::new();
        store
            .expect_set_ex()
            .with(eq("pulse:k:analytics:post:42"), eq("{\"views\":5}"), eq(300))
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_sadd()
            .with(eq("pulse:t:post:42"), eq("pulse:k:analytics:post:42"))
            .times(1)
            .returning(|_, _| Ok(()));

        let cache = service_over(store).await;
        let options = CacheOptions::new().with_ttl_secs(300).with_tag("post:42");
        cache.set_raw("analytics:post:42", "{\"views\":5}", &options).await;
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss() {
        let mut store = MockCacheStore::new();
        store.expect_get().returning(|_| Ok(Some("not json".to_string())));

        let cache = service_over(store).await;
        assert_eq!(cache.get::<u32>("k").await, None);
        assert!(cache.is_connected());
    }

    #[tokio::test]
    async fn test_command_error_keeps_connection() {
        let mut store = MockCacheStore::new();
        store
            .expect_incr_by()
            .returning(|_, _| Err(CacheError::Backend("value is not an integer".to_string())));

        let cache = service_over(store).await;
        assert_eq!(cache.increment("k", 1).await, 0);
        assert_eq!(cache.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_transport_error_reconnects() {
        let calls = AtomicU32::new(0);
        let mut store = MockCacheStore::new();
        store.expect_get().returning(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(CacheError::ConnectionFailed("connection reset".to_string()))
            } else {
                Ok(Some("1".to_string()))
            }
        });

        let cache = service_over(store).await;
        assert_eq!(cache.get::<u32>("k").await, None);
        assert!(!cache.is_connected());

        assert!(cache.ready().await);
        assert_eq!(cache.get::<u32>("k").await, Some(1));
    }

    #[tokio::test]
    async fn test_get_or_set_factory_error_writes_nothing() {
        let mut store = MockCacheStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_set_ex().never();

        let cache = service_over(store).await;
        let result: Result<u32, String> = cache
            .get_or_set("k", || async { Err("source down".to_string()) }, &CacheOptions::new())
            .await;

        assert_eq!(result, Err("source down".to_string()));
    }

    #[tokio::test]
    async fn test_invalidate_by_tag_skips_foreign_members() {
        let mut store = MockCacheStore::new();
        store
            .expect_smembers()
            .with(eq("pulse:t:post:1"))
            .returning(|_| {
                Ok(vec![
                    "pulse:k:a".to_string(),
                    "pulse:t:other".to_string(),
                    "other:b".to_string(),
                ])
            });
        store
            .expect_del()
            .withf(|keys: &[String]| keys.len() == 1 && keys[0] == "pulse:k:a")
            .times(1)
            .returning(|_| Ok(1));
        store
            .expect_del()
            .withf(|keys: &[String]| keys.len() == 1 && keys[0] == "pulse:t:post:1")
            .times(1)
            .returning(|_| Ok(1));

        let cache = service_over(store).await;
        assert_eq!(cache.invalidate_by_tag("post:1").await, 1);
    }

    #[tokio::test]
    async fn test_ttl_absent_maps_to_minus_one() {
        let mut store = MockCacheStore::new();
        store.expect_ttl().with(eq("pulse:k:gone")).returning(|_| Ok(-2));
        store.expect_ttl().with(eq("pulse:k:live")).returning(|_| Ok(42));

        let cache = service_over(store).await;
        assert_eq!(cache.get_ttl("gone").await, -1);
        assert_eq!(cache.get_ttl("live").await, 42);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let cache = service_over(MockCacheStore::new()).await;

        cache.shutdown().await;
        cache.shutdown().await;

        assert_eq!(cache.state(), ConnectionState::Closed);
        assert!(!cache.ready().await);
        assert_eq!(cache.get_raw("k").await, None);
    }
}
