//! # Pulse Resilience
//!
//! Resilience patterns for Pulse.
//! Provides the retry policy used to reconnect to infrastructure
//! dependencies such as the cache store.

pub mod retry;

pub use retry::*;
