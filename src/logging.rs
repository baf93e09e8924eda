//! Logging configuration for zk-session.
//!
//! The library itself only emits `tracing` events; hosts that have no
//! subscriber of their own can install a stderr one here.

use tracing_subscriber::EnvFilter;

use crate::error::{Result, ZkError};

/// Initializes logging to stderr.
///
/// `RUST_LOG` takes precedence over `default_filter`. Fails if a global
/// subscriber is already installed.
pub fn init_stderr_logging(default_filter: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ZkError::internal(format!("Could not install log subscriber: {e}")))
}
