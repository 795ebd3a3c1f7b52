//! Integration tests for CacheService against a real Redis.
//!
//! These tests run against Redis using testcontainers.
//! Requires Docker to be available on the system; run with `--ignored`.

mod common;

use common::TestRedis;
use pulse_cache::{CacheExt, CacheInterface, CacheOptions, CacheService, ConnectionState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AccountSummary {
    followers: u64,
    posts: u32,
}

fn unique_prefix() -> String {
    format!("test:{}:", uuid::Uuid::new_v4().simple())
}

async fn connected(redis: &TestRedis) -> CacheService {
    let cache = CacheService::from_config(&redis.config(&unique_prefix()));
    assert!(cache.ready().await, "failed to connect to {}", redis.url());
    cache
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_roundtrip_and_ttl() {
    let redis = TestRedis::new().await;
    let cache = connected(&redis).await;
    let summary = AccountSummary { followers: 120, posts: 8 };

    cache
        .set("analytics:account:1", &summary, &CacheOptions::new().with_ttl_secs(300))
        .await;

    assert_eq!(cache.get::<AccountSummary>("analytics:account:1").await, Some(summary));
    let ttl = cache.get_ttl("analytics:account:1").await;
    assert!((299..=300).contains(&ttl), "unexpected ttl {ttl}");

    assert!(cache.delete("analytics:account:1").await);
    assert_eq!(cache.get_ttl("analytics:account:1").await, -1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_expiry() {
    let redis = TestRedis::new().await;
    let cache = connected(&redis).await;

    cache.set("short", &1, &CacheOptions::new().with_ttl_secs(1)).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(cache.get::<i32>("short").await, None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_tags_patterns_and_counters() {
    let redis = TestRedis::new().await;
    let cache = connected(&redis).await;
    let tagged = CacheOptions::new().with_tag("post:5");

    cache.set("analytics:post:5", &1, &tagged).await;
    cache.set("feed:5", &2, &tagged).await;
    cache.set("analytics:account:5", &3, &CacheOptions::new()).await;

    assert_eq!(cache.invalidate_by_tag("post:5").await, 2);
    assert!(!cache.exists("analytics:post:5").await);
    assert!(cache.exists("analytics:account:5").await);

    assert_eq!(cache.increment("counter:x", 1).await, 1);
    assert_eq!(cache.increment("counter:x", 1).await, 2);
    assert_eq!(cache.increment("counter:x", 1).await, 3);
    assert_eq!(cache.get_ttl("counter:x").await, -1);

    assert_eq!(cache.delete_by_pattern("analytics:*").await, 1);
    assert_eq!(cache.clear().await, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_tag_index_unreachable_from_keys() {
    let redis = TestRedis::new().await;
    let cache = connected(&redis).await;

    cache.set("tag:x", &"user value", &CacheOptions::new()).await;
    cache.set("a", &1, &CacheOptions::new().with_tag("x")).await;

    assert_eq!(cache.invalidate_by_tag("x").await, 1);
    assert!(!cache.exists("a").await);
    assert!(cache.exists("tag:x").await);

    cache.set("k", &1, &CacheOptions::new().with_ttl_secs(u64::MAX)).await;
    assert!(!cache.exists("k").await);
    assert!(cache.is_connected());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_clear_leaves_other_prefixes() {
    let redis = TestRedis::new().await;
    let ours = connected(&redis).await;
    let theirs = connected(&redis).await;

    ours.set("k", &1, &CacheOptions::new()).await;
    theirs.set("k", &2, &CacheOptions::new()).await;

    assert_eq!(ours.clear().await, 1);
    assert_eq!(theirs.get::<i32>("k").await, Some(2));

    ours.shutdown().await;
    assert_eq!(ours.state(), ConnectionState::Closed);
    assert!(theirs.is_connected());
}
