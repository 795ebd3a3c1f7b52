//! Analytics read models.

use serde::{Deserialize, Serialize};

/// Aggregated engagement metrics for one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMetrics {
    pub post_id: String,
    pub account_id: String,
    pub impressions: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

impl PostMetrics {
    /// Total interactions (likes, comments and shares).
    #[must_use]
    pub const fn engagements(&self) -> u64 {
        self.likes + self.comments + self.shares
    }

    /// Engagements per impression, `0.0` for an unseen post.
    #[must_use]
    pub fn engagement_rate(&self) -> f64 {
        if self.impressions == 0 {
            return 0.0;
        }
        self.engagements() as f64 / self.impressions as f64
    }
}

/// Rolled-up analytics for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_id: String,
    pub followers: u64,
    pub post_count: u64,
    pub total_engagements: u64,
}

impl AccountSummary {
    /// Average engagements per post, `0.0` for an account without posts.
    #[must_use]
    pub fn average_engagements(&self) -> f64 {
        if self.post_count == 0 {
            return 0.0;
        }
        self.total_engagements as f64 / self.post_count as f64
    }
}
