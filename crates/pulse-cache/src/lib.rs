//! Pulse Cache - Fail-open caching over Redis
//!
//! A best-effort cache facade for read-heavy services:
//! - Typed get/set with JSON serialization
//! - Cache-aside composition (`get_or_set`)
//! - Tag-based bulk invalidation and glob deletes
//! - Key namespacing under a configurable prefix
//! - Background reconnection with bounded exponential backoff
//!
//! Store failures never reach callers. Every operation either succeeds or
//! returns its documented default, so a cache outage degrades to
//! pass-through instead of failing the request.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_cache::{CacheExt, CacheOptions, CacheService};
//! use pulse_config::RedisConfig;
//!
//! let cache = CacheService::from_config(&RedisConfig::with_url("redis://localhost:6379"));
//! cache.ready().await;
//!
//! let metrics: PostMetrics = cache
//!     .get_or_set(
//!         "analytics:post:42",
//!         || async { source.fetch_post(42).await },
//!         &CacheOptions::new().with_ttl_secs(300).with_tag("post:42"),
//!     )
//!     .await?;
//!
//! cache.invalidate_by_tag("post:42").await;
//! ```

mod cache_interface;
mod connection;
pub mod error;
pub mod keys;
pub mod metrics;
mod options;
mod service;
mod state;
pub mod store;

pub use cache_interface::{CacheExt, CacheInterface};
pub use error::{CacheError, CacheResult};
pub use keys::KeyNamespace;
pub use metrics::{register_metrics, CacheMetrics};
pub use options::{CacheOptions, DEFAULT_TTL};
pub use service::{CacheService, CacheSettings, DEFAULT_KEY_PREFIX};
pub use state::ConnectionState;
pub use store::{
    connector_for_url, glob_match, redact_url, CacheStore, MemoryConnector, MemoryStore, RedisConnector,
    RedisStore, StoreConnector,
};
