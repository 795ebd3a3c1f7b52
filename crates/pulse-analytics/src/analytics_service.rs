//! Cached analytics lookups.

use crate::cache_keys;
use crate::models::{AccountSummary, PostMetrics};
use crate::source::AnalyticsSource;
use pulse_cache::{CacheExt, CacheInterface, CacheOptions};
use pulse_config::AnalyticsConfig;
use pulse_core::PulseResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Analytics reads composed over the cache.
///
/// Lookups go through `get_or_set`, so a cache outage only costs latency.
/// Source errors are returned unchanged.
pub struct AnalyticsService {
    cache: Arc<dyn CacheInterface>,
    source: Arc<dyn AnalyticsSource>,
    post_ttl: Duration,
    account_ttl: Duration,
}

impl AnalyticsService {
    /// Creates a new analytics service.
    pub fn new(cache: Arc<dyn CacheInterface>, source: Arc<dyn AnalyticsSource>, config: &AnalyticsConfig) -> Self {
        Self {
            cache,
            source,
            post_ttl: config.post_ttl(),
            account_ttl: config.account_ttl(),
        }
    }

    /// Metrics for a post, from cache when warm.
    pub async fn post_metrics(&self, post_id: &str) -> PulseResult<PostMetrics> {
        debug!(post_id = post_id, "Getting post metrics");

        let options = CacheOptions::new()
            .with_ttl(self.post_ttl)
            .with_tag(cache_keys::post_tag(post_id));

        self.cache
            .get_or_set(
                &cache_keys::post_metrics(post_id),
                || self.source.fetch_post_metrics(post_id),
                &options,
            )
            .await
    }

    /// Summary for an account, from cache when warm.
    pub async fn account_summary(&self, account_id: &str) -> PulseResult<AccountSummary> {
        debug!(account_id = account_id, "Getting account summary");

        let options = CacheOptions::new()
            .with_ttl(self.account_ttl)
            .with_tag(cache_keys::account_tag(account_id));

        self.cache
            .get_or_set(
                &cache_keys::account_summary(account_id),
                || self.source.fetch_account_summary(account_id),
                &options,
            )
            .await
    }

    /// Counts an engagement and drops the now-stale cached aggregates.
    ///
    /// Returns the post's running engagement count, or `0` while the cache
    /// is unavailable.
    pub async fn record_engagement(&self, post_id: &str, account_id: &str) -> i64 {
        let count = self
            .cache
            .increment(&cache_keys::engagement_counter(post_id), 1)
            .await;

        self.cache.invalidate_by_tag(&cache_keys::post_tag(post_id)).await;
        self.cache
            .invalidate_by_tag(&cache_keys::account_tag(account_id))
            .await;

        debug!(post_id = post_id, account_id = account_id, count, "Recorded engagement");
        count
    }

    /// Engagements recorded through `record_engagement` so far.
    pub async fn engagement_count(&self, post_id: &str) -> i64 {
        self.cache
            .get::<i64>(&cache_keys::engagement_counter(post_id))
            .await
            .unwrap_or(0)
    }

    /// Forces the next account lookup to hit the source.
    ///
    /// Returns the number of cached entries dropped.
    pub async fn refresh_account(&self, account_id: &str) -> u64 {
        let deleted = self
            .cache
            .invalidate_by_tag(&cache_keys::account_tag(account_id))
            .await;

        info!(account_id = account_id, deleted, "Refreshed account analytics");
        deleted
    }

    /// Drops every cached post metrics entry.
    pub async fn flush_post_metrics(&self) -> u64 {
        self.cache
            .delete_by_pattern(&cache_keys::post_metrics_pattern())
            .await
    }
}
