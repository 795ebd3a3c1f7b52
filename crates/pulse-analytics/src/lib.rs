//! Pulse Analytics - Cached analytics lookups
//!
//! Post metrics and account summaries are read through the cache with
//! cache-aside composition and invalidated by tag when engagement changes.

mod analytics_service;
pub mod cache_keys;
mod models;
mod source;

pub use analytics_service::AnalyticsService;
pub use models::{AccountSummary, PostMetrics};
pub use source::AnalyticsSource;
