//! Result type aliases for Pulse.

use crate::PulseError;

/// A specialized `Result` type for Pulse operations.
pub type PulseResult<T> = Result<T, PulseError>;
