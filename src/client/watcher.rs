//! Session event sink handed to the client at construction time.

use tracing::{info, warn};

/// Session state reported in a [`WatchedEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeeperState {
    Disconnected,
    SyncConnected,
    AuthFailed,
    ConnectedReadOnly,
    SaslAuthenticated,
    Expired,
    Closed,
}

/// A session event delivered by the client library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedEvent {
    pub state: KeeperState,
    /// Znode path for node events, `None` for pure session events.
    pub path: Option<String>,
}

impl WatchedEvent {
    /// Creates a session event with no path.
    pub fn session(state: KeeperState) -> Self {
        Self { state, path: None }
    }
}

/// Receives session events from the client library.
///
/// The connection manager passes the watcher through to the connector
/// unmodified and never inspects the events itself.
pub trait SessionWatcher: Send + Sync {
    fn process(&self, event: WatchedEvent);
}

/// Watcher that only logs session events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingWatcher;

impl SessionWatcher for LoggingWatcher {
    fn process(&self, event: WatchedEvent) {
        match event.state {
            KeeperState::Expired | KeeperState::AuthFailed => {
                warn!(state = ?event.state, path = ?event.path, "Coordination session event")
            }
            _ => info!(state = ?event.state, path = ?event.path, "Coordination session event"),
        }
    }
}
