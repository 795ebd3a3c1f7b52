//! Cache key and tag generators for consistent key naming.
//!
//! Keys are relative; the cache service adds its own namespace prefix.

/// Segment all analytics keys live under.
const ANALYTICS_SEGMENT: &str = "analytics";

/// Generate the cache key for a post's metrics.
#[must_use]
pub fn post_metrics(post_id: &str) -> String {
    format!("{}:post:{}", ANALYTICS_SEGMENT, post_id)
}

/// Generate the cache key for an account's summary.
#[must_use]
pub fn account_summary(account_id: &str) -> String {
    format!("{}:account:{}", ANALYTICS_SEGMENT, account_id)
}

/// Generate the counter key for engagements recorded against a post.
#[must_use]
pub fn engagement_counter(post_id: &str) -> String {
    format!("{}:engagements:post:{}", ANALYTICS_SEGMENT, post_id)
}

/// Tag grouping every cached entry derived from a post.
#[must_use]
pub fn post_tag(post_id: &str) -> String {
    format!("post:{}", post_id)
}

/// Tag grouping every cached entry derived from an account.
#[must_use]
pub fn account_tag(account_id: &str) -> String {
    format!("account:{}", account_id)
}

/// Pattern matching every cached post metrics entry.
#[must_use]
pub fn post_metrics_pattern() -> String {
    format!("{}:post:*", ANALYTICS_SEGMENT)
}
