//! Process-wide connection manager.
//!
//! The application's startup code installs one manager; everything else
//! reaches the shared client through [`client`].

use std::sync::{Arc, OnceLock};

use tracing::info;

use super::ConnectionManager;
use crate::client::ClientHandle;
use crate::error::{Result, ZkError};

static MANAGER: OnceLock<Arc<ConnectionManager>> = OnceLock::new();

/// Installs the process-wide manager.
///
/// Fails with [`ZkError::AlreadyInstalled`] if one is already installed.
pub fn install(manager: ConnectionManager) -> Result<Arc<ConnectionManager>> {
    let manager = Arc::new(manager);
    MANAGER
        .set(Arc::clone(&manager))
        .map_err(|_| ZkError::AlreadyInstalled)?;
    info!(
        config = %manager.config().display_string(),
        "Installed process-wide connection manager"
    );
    Ok(manager)
}

/// Returns the installed manager, if any.
pub fn get() -> Option<Arc<ConnectionManager>> {
    MANAGER.get().cloned()
}

/// Returns the shared client from the installed manager.
pub async fn client() -> Option<ClientHandle> {
    match get() {
        Some(manager) => manager.get_or_create().await,
        None => None,
    }
}
