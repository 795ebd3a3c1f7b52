//! Application configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Redis cache configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Analytics caching configuration.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "pulse".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Redis cache configuration.
///
/// A missing or empty `url` disables caching; every cache operation then
/// becomes a no-op returning its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (`redis://`, `rediss://`, `unix://`, or `memory://`).
    #[serde(default)]
    pub url: Option<String>,

    /// Prefix applied to every key written by the cache.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// TTL used when a write does not specify one.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Consecutive failed connection attempts before caching is disabled.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Delay before the first reconnection attempt, in milliseconds.
    #[serde(default = "default_reconnect_base_delay")]
    pub reconnect_base_delay_ms: u64,

    /// Upper bound on the delay between reconnection attempts, in milliseconds.
    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: default_key_prefix(),
            default_ttl_secs: default_ttl_secs(),
            connect_timeout_secs: default_connect_timeout(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay(),
            reconnect_max_delay_ms: default_reconnect_max_delay(),
        }
    }
}

fn default_key_prefix() -> String {
    "pulse:".to_string()
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

fn default_reconnect_base_delay() -> u64 {
    100
}

fn default_reconnect_max_delay() -> u64 {
    3000
}

impl RedisConfig {
    /// Creates a configuration pointing at `url` with default settings.
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Returns the configured URL, treating an empty string as absent.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// Returns true if a connection URL is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.url().is_some()
    }

    /// Returns the default TTL as a Duration.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the first reconnection delay as a Duration.
    #[must_use]
    pub const fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    /// Returns the reconnection delay cap as a Duration.
    #[must_use]
    pub const fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }
}

/// Analytics caching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// TTL for per-post metrics, in seconds.
    pub post_ttl_secs: u64,
    /// TTL for account summaries, in seconds.
    pub account_ttl_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            post_ttl_secs: 300,    // 5 minutes
            account_ttl_secs: 900, // 15 minutes
        }
    }
}

impl AnalyticsConfig {
    /// Returns the post metrics TTL as a Duration.
    #[must_use]
    pub const fn post_ttl(&self) -> Duration {
        Duration::from_secs(self.post_ttl_secs)
    }

    /// Returns the account summary TTL as a Duration.
    #[must_use]
    pub const fn account_ttl(&self) -> Duration {
        Duration::from_secs(self.account_ttl_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_defaults() {
        let config = RedisConfig::default();
        assert!(config.url.is_none());
        assert!(!config.is_enabled());
        assert_eq!(config.key_prefix, "pulse:");
        assert_eq!(config.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.reconnect_max_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_empty_url_is_disabled() {
        let config = RedisConfig::with_url("   ");
        assert!(!config.is_enabled());
        assert_eq!(config.url(), None);

        let config = RedisConfig::with_url("redis://localhost:6379");
        assert!(config.is_enabled());
        assert_eq!(config.url(), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_partial_redis_section_uses_defaults() {
        let config: RedisConfig =
            serde_json::from_str(r#"{"url": "redis://cache:6379", "key_prefix": "app:"}"#).unwrap();
        assert_eq!(config.key_prefix, "app:");
        assert_eq!(config.default_ttl_secs, 3600);
        assert_eq!(config.connect_timeout_secs, 5);
    }

    #[test]
    fn test_partial_analytics_section_uses_defaults() {
        let config: AnalyticsConfig = serde_json::from_str(r#"{"post_ttl_secs": 60}"#).unwrap();
        assert_eq!(config.post_ttl_secs, 60);
        assert_eq!(config.account_ttl_secs, 900);
    }

    #[test]
    fn test_analytics_defaults() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.post_ttl(), Duration::from_secs(300));
        assert_eq!(config.account_ttl(), Duration::from_secs(900));
    }
}
