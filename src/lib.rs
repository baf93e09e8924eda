//! zk-session - lifecycle management for a single shared coordination
//! service session.
//!
//! A [`ConnectionManager`] lazily builds one coordination client, hands it
//! out to every caller, rebuilds it once the session has terminated, and
//! closes it on shutdown.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;

pub use client::{ClientHandle, ConnectivityState, Connector, CoordinationClient, SessionWatcher};
pub use config::{Config, SessionConfig};
pub use connection::{ConnectionManager, TeardownOutcome};
pub use error::{Result, ZkError};
