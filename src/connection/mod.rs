//! Connection management for zk-session.
//!
//! Centralizes the lifecycle of the shared coordination client.

pub mod global;
pub mod manager;

pub use manager::{ConnectionManager, TeardownOutcome};
