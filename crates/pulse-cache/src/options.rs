//! Per-write cache options.

use std::time::Duration;

/// TTL applied when neither the write nor the configuration specify one (1 hour).
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Options for a single cache write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Time-to-live; falls back to the service default when `None`.
    pub ttl: Option<Duration>,
    /// Tags the entry is indexed under for bulk invalidation.
    pub tags: Vec<String>,
}

impl CacheOptions {
    /// Creates empty options (default TTL, no tags).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the TTL in whole seconds.
    #[must_use]
    pub fn with_ttl_secs(self, secs: u64) -> Self {
        self.with_ttl(Duration::from_secs(secs))
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Adds several tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Resolves the TTL to whole seconds, never below one.
    #[must_use]
    pub fn ttl_secs_or(&self, default: Duration) -> u64 {
        self.ttl.unwrap_or(default).as_secs().max(1)
    }
}
