//! Client connectivity states.

use std::fmt;

/// Connectivity state of a coordination client, mirroring the protocol's
/// published client state enum.
///
/// Session expiry and a client-initiated close are both reported as
/// [`ConnectivityState::Closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectivityState {
    Connecting,
    Associating,
    Connected,
    ConnectedReadOnly,
    Closed,
    AuthFailed,
    NotConnected,
}

impl ConnectivityState {
    /// States in which a close must be issued on the handle.
    pub const CLOSEABLE: [ConnectivityState; 4] = [
        Self::Associating,
        Self::Connected,
        Self::ConnectedReadOnly,
        Self::Connecting,
    ];

    /// Every state, in declaration order.
    pub const ALL: [ConnectivityState; 7] = [
        Self::Connecting,
        Self::Associating,
        Self::Connected,
        Self::ConnectedReadOnly,
        Self::Closed,
        Self::AuthFailed,
        Self::NotConnected,
    ];

    /// Whether a handle in this state holds a session that must be closed.
    ///
    /// Handles outside this set are terminated and are never closed again;
    /// the connection manager rebuilds them on access.
    pub fn is_closeable(self) -> bool {
        Self::CLOSEABLE.contains(&self)
    }

    /// Whether the session has not been terminated by the ensemble or the client.
    pub fn is_alive(self) -> bool {
        !matches!(self, Self::Closed | Self::AuthFailed)
    }

    /// Whether the client is attached to a server.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::ConnectedReadOnly)
    }

    /// Returns the protocol name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Associating => "ASSOCIATING",
            Self::Connected => "CONNECTED",
            Self::ConnectedReadOnly => "CONNECTEDREADONLY",
            Self::Closed => "CLOSED",
            Self::AuthFailed => "AUTH_FAILED",
            Self::NotConnected => "NOT_CONNECTED",
        }
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
