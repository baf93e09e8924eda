//! Coordination client boundary for zk-session.
//!
//! The wire protocol lives in an external client library; this module
//! defines the seam the connection manager drives it through, allowing
//! different client implementations to be used interchangeably.

mod mock;
mod state;
mod watcher;

pub use mock::{CloseBehavior, MockConnector, MockCoordinationClient};
pub use state::ConnectivityState;
pub use watcher::{KeeperState, LoggingWatcher, SessionWatcher, WatchedEvent};

use crate::config::SessionConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Shared handle to a live or dead coordination session.
pub type ClientHandle = Arc<dyn CoordinationClient>;

/// A coordination client object wrapping one session with the ensemble.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Returns the current connectivity state.
    fn state(&self) -> ConnectivityState;

    /// Returns the session id assigned by the ensemble.
    fn session_id(&self) -> i64;

    /// Closes the session.
    ///
    /// May wait for in-flight protocol exchanges to settle.
    async fn close(&self) -> Result<()>;
}

/// Constructs coordination clients.
///
/// An `Err` from [`Connector::connect`] means the client object could not
/// be constructed at all; connection loss after construction is reported
/// through the client's state and the session watcher instead.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        config: &SessionConfig,
        watcher: Arc<dyn SessionWatcher>,
    ) -> Result<ClientHandle>;
}
