//! Cache store error types.
//!
//! These errors describe failures talking to the backing store. They are
//! logged and counted by `CacheService` and never returned to its callers.

use std::time::Duration;
use thiserror::Error;

/// Result type for store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Backing store errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis client error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The store could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connecting took longer than the configured timeout.
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// The connection URL is malformed or uses an unsupported scheme.
    #[error("Invalid cache URL: {0}")]
    InvalidUrl(String),

    /// The store rejected a command (wrong type, bad value, ...).
    #[error("Backend error: {0}")]
    Backend(String),
}

impl CacheError {
    /// Returns true if the error means the connection itself is unusable.
    ///
    /// Connection errors flip the service into the disconnected state and
    /// trigger reconnection; anything else only fails the single command.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Redis(e) => {
                e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
            }
            Self::ConnectionFailed(_) | Self::Timeout(_) => true,
            Self::InvalidUrl(_) | Self::Backend(_) => false,
        }
    }
}
