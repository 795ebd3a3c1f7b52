//! Authoritative analytics source.

use crate::models::{AccountSummary, PostMetrics};
use async_trait::async_trait;
use pulse_core::PulseResult;

/// Slow authoritative lookups (database aggregates, platform APIs).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    /// Fetches current metrics for a post.
    async fn fetch_post_metrics(&self, post_id: &str) -> PulseResult<PostMetrics>;

    /// Fetches the current summary for an account.
    async fn fetch_account_summary(&self, account_id: &str) -> PulseResult<AccountSummary>;
}
