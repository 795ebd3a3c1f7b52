//! Connection lifecycle states.

use std::fmt;

/// Connection state of a `CacheService`.
///
/// ```text
/// Disconnected -> Connecting -> Connected
///      ^              |             |
///      |   (retry)    |             | transport error
///      +--------------+-------------+
///                     |
///                     v  (attempts exhausted)
///                  Disabled
/// ```
///
/// `Disabled` is terminal: it is entered when no URL is configured or
/// reconnection gave up. `Closed` is entered on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Caching is off for the lifetime of the service.
    Disabled,
    /// Not connected; a connection attempt is pending.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The store is reachable and commands are sent.
    Connected,
    /// The service was shut down.
    Closed,
}

impl ConnectionState {
    /// Returns true if commands are currently sent to the store.
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true if no further automatic transition will happen
    /// without an external event (a transport error or shutdown).
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Connected | Self::Disabled | Self::Closed)
    }

    /// Stable lowercase name, used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connected_is_connected() {
        assert!(ConnectionState::Connected.is_connected());
        for state in [
            ConnectionState::Disabled,
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Closed,
        ] {
            assert!(!state.is_connected());
        }
    }

    #[test]
    fn test_settled_states() {
        assert!(ConnectionState::Connected.is_settled());
        assert!(ConnectionState::Disabled.is_settled());
        assert!(ConnectionState::Closed.is_settled());
        assert!(!ConnectionState::Connecting.is_settled());
        assert!(!ConnectionState::Disconnected.is_settled());
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
