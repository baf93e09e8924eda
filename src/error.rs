//! Error types for zk-session.
//!
//! Defines the error enum shared by the configuration layer, the client
//! boundary and the connection manager.

use thiserror::Error;

/// Main error type for zk-session operations.
#[derive(Error, Debug)]
pub enum ZkError {
    /// The client object could not be constructed (malformed connection
    /// string, synchronous I/O setup failure, etc.)
    #[error("Construction error: {0}")]
    Construction(String),

    /// Closing an established session failed.
    #[error("Close error: {0}")]
    Close(String),

    /// Configuration errors (invalid config file, bad connection string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A process-wide manager has already been installed.
    #[error("Connection manager already installed")]
    AlreadyInstalled,

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ZkError {
    /// Creates a construction error with the given message.
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    /// Creates a close error with the given message.
    pub fn close(msg: impl Into<String>) -> Self {
        Self::Close(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Construction(_) => "Construction Error",
            Self::Close(_) => "Close Error",
            Self::Config(_) => "Configuration Error",
            Self::AlreadyInstalled => "Lifecycle Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using ZkError.
pub type Result<T> = std::result::Result<T, ZkError>;
