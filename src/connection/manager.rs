//! Connection manager for the shared coordination client.
//!
//! Owns at most one client handle, rebuilds it when it is found
//! terminated, and closes it deterministically on teardown.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{ClientHandle, ConnectivityState, Connector, SessionWatcher};
use crate::config::SessionConfig;

/// What happened to the held client during teardown.
///
/// The manager holds no client after any of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// No client was held.
    NothingHeld,
    /// The client had already terminated; no close was issued.
    AlreadyTerminated(ConnectivityState),
    /// Close was issued and completed.
    Closed,
    /// Close was issued and returned an error.
    CloseFailed(String),
    /// The wait for close to complete was interrupted.
    Interrupted,
}

/// Manages the single shared coordination client.
pub struct ConnectionManager {
    config: SessionConfig,
    watcher: Arc<dyn SessionWatcher>,
    connector: Arc<dyn Connector>,
    client: Mutex<Option<ClientHandle>>,
    stopped: AtomicBool,
    interrupt: CancellationToken,
}

impl ConnectionManager {
    /// Creates a manager. No client is built until [`initialize`] or
    /// [`get_or_create`] is called.
    ///
    /// [`initialize`]: ConnectionManager::initialize
    /// [`get_or_create`]: ConnectionManager::get_or_create
    pub fn new(
        config: SessionConfig,
        watcher: Arc<dyn SessionWatcher>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config,
            watcher,
            connector,
            client: Mutex::new(None),
            stopped: AtomicBool::new(false),
            interrupt: CancellationToken::new(),
        }
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Token that interrupts the close-wait of [`teardown`](ConnectionManager::teardown).
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    /// Whether teardown has run.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Startup hook: builds the client.
    ///
    /// Construction failures are logged and leave no client held; they are
    /// never returned to the caller. Does nothing while a live client is
    /// held or after teardown.
    pub async fn initialize(&self) {
        let mut slot = self.client.lock().await;
        if let Some(current) = slot.as_ref() {
            let state = current.state();
            if state.is_closeable() {
                warn!(
                    session = %session_label(current.session_id()),
                    %state,
                    "Coordination client is already initialized"
                );
                return;
            }
        }
        self.initialize_locked(&mut slot).await;
    }

    /// Returns the shared client, rebuilding it first when none is held or
    /// the held one has terminated.
    ///
    /// `None` means the coordination service is currently unavailable.
    pub async fn get_or_create(&self) -> Option<ClientHandle> {
        let mut slot = self.client.lock().await;
        let rebuild = match slot.as_ref() {
            None => true,
            Some(current) => {
                let state = current.state();
                if !state.is_closeable() {
                    info!(
                        session = %session_label(current.session_id()),
                        %state,
                        terminated = !state.is_alive(),
                        "Coordination client is no longer usable, rebuilding"
                    );
                }
                !state.is_closeable()
            }
        };

        if rebuild {
            self.initialize_locked(&mut slot).await;
        }

        slot.clone()
    }

    /// Returns the held client without rebuilding it.
    pub async fn current(&self) -> Option<ClientHandle> {
        self.client.lock().await.clone()
    }

    /// Shutdown hook: closes the held client if it is still closeable and
    /// clears it.
    ///
    /// The close-wait can be interrupted through
    /// [`interrupt_token`](ConnectionManager::interrupt_token).
    pub async fn teardown(&self) -> TeardownOutcome {
        let interrupt = self.interrupt.clone();
        self.teardown_with(&interrupt).await
    }

    /// Like [`teardown`](ConnectionManager::teardown), interrupted by `cancel`.
    ///
    /// Never fails and is idempotent. On interruption `cancel` is left
    /// cancelled for the rest of the caller's shutdown sequence.
    pub async fn teardown_with(&self, cancel: &CancellationToken) -> TeardownOutcome {
        let client = {
            let mut slot = self.client.lock().await;
            self.stopped.store(true, Ordering::SeqCst);
            slot.take()
        };

        let Some(client) = client else {
            debug!("No coordination client to tear down");
            return TeardownOutcome::NothingHeld;
        };

        let session = session_label(client.session_id());
        let state = client.state();
        if !state.is_closeable() {
            debug!(%session, %state, "Coordination client already terminated, skipping close");
            return TeardownOutcome::AlreadyTerminated(state);
        }

        tokio::select! {
            biased;

            result = client.close() => match result {
                Ok(()) => {
                    info!(%session, "Coordination client has been closed");
                    TeardownOutcome::Closed
                }
                Err(e) => {
                    warn!(%session, error = %e, "Failed to close the coordination client");
                    TeardownOutcome::CloseFailed(e.to_string())
                }
            },
            _ = cancel.cancelled() => {
                cancel.cancel();
                warn!(%session, "Interrupted while tearing down the coordination client");
                TeardownOutcome::Interrupted
            }
        }
    }

    /// Runs `body` between [`initialize`] and [`teardown`].
    ///
    /// Teardown runs on every exit path; a panic in `body` is resumed after
    /// teardown completes.
    ///
    /// [`initialize`]: ConnectionManager::initialize
    /// [`teardown`]: ConnectionManager::teardown
    pub async fn run_scoped<F, Fut, T>(self: &Arc<Self>, body: F) -> T
    where
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: Future<Output = T>,
    {
        self.initialize().await;

        let manager = Arc::clone(self);
        let result = AssertUnwindSafe(async move { body(manager).await })
            .catch_unwind()
            .await;

        self.teardown().await;

        match result {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn initialize_locked(&self, slot: &mut Option<ClientHandle>) {
        // A terminated handle is dropped without a close.
        *slot = None;

        if self.is_stopped() {
            warn!("Connection manager has been torn down, not creating a coordination client");
            return;
        }

        match self
            .connector
            .connect(&self.config, Arc::clone(&self.watcher))
            .await
        {
            Ok(client) => {
                info!(
                    connection_string = %self.config.connection_string,
                    session = %session_label(client.session_id()),
                    "Coordination client has been initialized"
                );
                *slot = Some(client);
            }
            Err(e) => {
                error!(
                    connection_string = %self.config.connection_string,
                    error = %e,
                    "Cannot initialize the coordination client"
                );
            }
        }
    }
}

fn session_label(session_id: i64) -> String {
    format!("0x{session_id:x}")
}
