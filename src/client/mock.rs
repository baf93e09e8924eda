//! In-memory coordination client for testing and embedding.
//!
//! Sessions never touch the network; their state is driven explicitly.

use super::{
    ClientHandle, ConnectivityState, Connector, CoordinationClient, KeeperState, SessionWatcher,
    WatchedEvent,
};
use crate::config::SessionConfig;
use crate::error::{Result, ZkError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// How a mock session responds to `close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseBehavior {
    /// Close completes at once.
    #[default]
    Immediate,
    /// Close returns an error and leaves the state untouched.
    Fail,
    /// Close waits for the given duration before completing.
    Delay(Duration),
}

/// A mock session whose state is set by the test.
pub struct MockCoordinationClient {
    session_id: i64,
    state: Mutex<ConnectivityState>,
    close_calls: AtomicUsize,
    close_behavior: CloseBehavior,
    watcher: Arc<dyn SessionWatcher>,
}

impl MockCoordinationClient {
    /// Creates a mock session in the given state.
    pub fn new(
        session_id: i64,
        state: ConnectivityState,
        close_behavior: CloseBehavior,
        watcher: Arc<dyn SessionWatcher>,
    ) -> Self {
        Self {
            session_id,
            state: Mutex::new(state),
            close_calls: AtomicUsize::new(0),
            close_behavior,
            watcher,
        }
    }

    /// Moves the session to `state`, as if the ensemble had reported it.
    pub fn set_state(&self, state: ConnectivityState) {
        self.transition(state, keeper_state_for(state));
    }

    /// Expires the session.
    pub fn expire(&self) {
        self.transition(ConnectivityState::Closed, Some(KeeperState::Expired));
    }

    /// Number of times `close` has been called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn transition(&self, state: ConnectivityState, event: Option<KeeperState>) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        if let Some(keeper_state) = event {
            self.watcher.process(WatchedEvent::session(keeper_state));
        }
    }
}

#[async_trait]
impl CoordinationClient for MockCoordinationClient {
    fn state(&self) -> ConnectivityState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_id(&self) -> i64 {
        self.session_id
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        match self.close_behavior {
            CloseBehavior::Immediate => {}
            CloseBehavior::Fail => {
                return Err(ZkError::close(format!(
                    "session 0x{:x} did not acknowledge close",
                    self.session_id
                )))
            }
            CloseBehavior::Delay(delay) => tokio::time::sleep(delay).await,
        }
        self.transition(ConnectivityState::Closed, Some(KeeperState::Closed));
        Ok(())
    }
}

fn keeper_state_for(state: ConnectivityState) -> Option<KeeperState> {
    match state {
        ConnectivityState::Connected => Some(KeeperState::SyncConnected),
        ConnectivityState::ConnectedReadOnly => Some(KeeperState::ConnectedReadOnly),
        ConnectivityState::Closed => Some(KeeperState::Closed),
        ConnectivityState::AuthFailed => Some(KeeperState::AuthFailed),
        ConnectivityState::Connecting | ConnectivityState::NotConnected => {
            Some(KeeperState::Disconnected)
        }
        ConnectivityState::Associating => None,
    }
}

/// A connector that hands out [`MockCoordinationClient`] sessions.
pub struct MockConnector {
    initial_state: ConnectivityState,
    close_behavior: CloseBehavior,
    connect_delay: Option<Duration>,
    partitioned: bool,
    failing: AtomicBool,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    next_session: AtomicI64,
    issued: Mutex<Vec<Arc<MockCoordinationClient>>>,
    last_config: Mutex<Option<SessionConfig>>,
}

impl MockConnector {
    /// Creates a connector whose sessions start out connected.
    pub fn new() -> Self {
        Self {
            initial_state: ConnectivityState::Connected,
            close_behavior: CloseBehavior::Immediate,
            connect_delay: None,
            partitioned: false,
            failing: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            next_session: AtomicI64::new(0x1000),
            issued: Mutex::new(Vec::new()),
            last_config: Mutex::new(None),
        }
    }

    /// Sets the state new sessions start in.
    pub fn with_initial_state(mut self, state: ConnectivityState) -> Self {
        self.initial_state = state;
        self
    }

    /// Sets how new sessions respond to `close`.
    pub fn with_close_behavior(mut self, behavior: CloseBehavior) -> Self {
        self.close_behavior = behavior;
        self
    }

    /// Makes every construction take `delay`.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Simulates an ensemble that has lost quorum.
    ///
    /// Sessions allowed to be read-only attach in `ConnectedReadOnly`; all
    /// others stay `Connecting`.
    pub fn with_partitioned_ensemble(mut self) -> Self {
        self.partitioned = true;
        self
    }

    /// Makes subsequent constructions fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of constructions attempted, failed ones included.
    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Highest number of constructions that were ever in progress at once.
    pub fn peak_concurrent_connects(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Every session handed out so far, oldest first.
    pub fn issued(&self) -> Vec<Arc<MockCoordinationClient>> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recently handed out session.
    pub fn last_issued(&self) -> Option<Arc<MockCoordinationClient>> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// The config passed to the most recent construction attempt.
    pub fn last_config(&self) -> Option<SessionConfig> {
        self.last_config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total `close` calls across every session handed out.
    pub fn total_close_calls(&self) -> usize {
        self.issued().iter().map(|c| c.close_calls()).sum()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        config: &SessionConfig,
        watcher: Arc<dyn SessionWatcher>,
    ) -> Result<ClientHandle> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let result = self.build(config, watcher).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl MockConnector {
    async fn build(
        &self,
        config: &SessionConfig,
        watcher: Arc<dyn SessionWatcher>,
    ) -> Result<ClientHandle> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(ZkError::construction(format!(
                "unable to reach ensemble {}",
                config.connection_string
            )));
        }

        config
            .validate()
            .map_err(|e| ZkError::construction(e.to_string()))?;
        let connect_string = config
            .connect_string()
            .map_err(|e| ZkError::construction(e.to_string()))?;

        let initial_state = match (self.partitioned, config.can_be_read_only) {
            (false, _) => self.initial_state,
            (true, true) => ConnectivityState::ConnectedReadOnly,
            (true, false) => ConnectivityState::Connecting,
        };

        let session_id = self.next_session.fetch_add(1, Ordering::SeqCst);
        let client = Arc::new(MockCoordinationClient::new(
            session_id,
            initial_state,
            self.close_behavior,
            Arc::clone(&watcher),
        ));
        debug!(
            session_id,
            hosts = connect_string.hosts.len(),
            timeout_ms = config.timeout_ms,
            state = %initial_state,
            "Mock session created"
        );

        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&client));

        if let Some(keeper_state) = keeper_state_for(initial_state) {
            watcher.process(WatchedEvent::session(keeper_state));
        }

        let handle: ClientHandle = client;
        Ok(handle)
    }
}
