//! Lifecycle scenarios for the connection manager.

use std::sync::Arc;

use zk_session::client::{CloseBehavior, LoggingWatcher, MockConnector};
use zk_session::{ConnectionManager, ConnectivityState, SessionConfig, TeardownOutcome};

use super::manager_for;

#[tokio::test]
async fn test_fresh_manager_returns_connected_client() {
    let connector = Arc::new(MockConnector::new());
    let manager = manager_for(&connector);

    let client = manager.get_or_create().await.expect("client should be built");

    assert!(client.state().is_connected());
    assert_eq!(connector.connect_attempts(), 1);
}

#[tokio::test]
async fn test_read_only_session_is_reused() {
    let connector = Arc::new(MockConnector::new().with_partitioned_ensemble());
    let manager = ConnectionManager::new(
        SessionConfig::new("zk1:2181").with_read_only(true),
        Arc::new(LoggingWatcher),
        connector.clone(),
    );

    let first = manager.get_or_create().await.unwrap();
    let second = manager.get_or_create().await.unwrap();

    assert_eq!(first.state(), ConnectivityState::ConnectedReadOnly);
    assert_eq!(first.session_id(), second.session_id());
    assert_eq!(connector.connect_attempts(), 1);
    assert!(connector.last_config().unwrap().can_be_read_only);
}

#[tokio::test]
async fn test_partitioned_ensemble_without_read_only_keeps_connecting() {
    let connector = Arc::new(MockConnector::new().with_partitioned_ensemble());
    let manager = manager_for(&connector);

    let client = manager.get_or_create().await.unwrap();

    assert_eq!(client.state(), ConnectivityState::Connecting);
    assert!(!connector.last_config().unwrap().can_be_read_only);
}

#[tokio::test]
async fn test_construction_failure_yields_absent_client() {
    let connector = Arc::new(MockConnector::new());
    connector.set_failing(true);
    let manager = manager_for(&connector);

    manager.initialize().await;

    assert!(manager.get_or_create().await.is_none());
}

#[tokio::test]
async fn test_malformed_connection_string_yields_absent_client() {
    let connector = Arc::new(MockConnector::new());
    let manager = ConnectionManager::new(
        SessionConfig::new("zk1:2181/bad//chroot"),
        Arc::new(LoggingWatcher),
        connector.clone(),
    );

    assert!(manager.get_or_create().await.is_none());
    assert_eq!(connector.connect_attempts(), 1);
    assert!(connector.issued().is_empty());
}

#[tokio::test]
async fn test_expired_session_is_rebuilt() {
    let connector = Arc::new(MockConnector::new());
    let manager = manager_for(&connector);

    let original = manager.get_or_create().await.unwrap();
    connector.last_issued().unwrap().expire();
    assert_eq!(original.state(), ConnectivityState::Closed);

    let rebuilt = manager.get_or_create().await.unwrap();

    assert_ne!(rebuilt.session_id(), original.session_id());
    assert_eq!(rebuilt.state(), ConnectivityState::Connected);
    assert_eq!(connector.connect_attempts(), 2);

    let again = manager.get_or_create().await.unwrap();
    assert!(Arc::ptr_eq(&rebuilt, &again));
    assert_eq!(connector.connect_attempts(), 2);
}

#[tokio::test]
async fn test_teardown_of_connected_client_closes_once() {
    let connector = Arc::new(MockConnector::new());
    let manager = manager_for(&connector);
    let client = manager.get_or_create().await.unwrap();

    assert_eq!(manager.teardown().await, TeardownOutcome::Closed);

    assert_eq!(connector.total_close_calls(), 1);
    assert_eq!(client.state(), ConnectivityState::Closed);
    assert!(manager.current().await.is_none());
}

#[tokio::test]
async fn test_teardown_of_client_closed_session_issues_no_close() {
    let connector = Arc::new(MockConnector::new());
    let manager = manager_for(&connector);
    manager.initialize().await;
    connector
        .last_issued()
        .unwrap()
        .set_state(ConnectivityState::Closed);

    assert_eq!(
        manager.teardown().await,
        TeardownOutcome::AlreadyTerminated(ConnectivityState::Closed)
    );

    assert_eq!(connector.total_close_calls(), 0);
    assert!(manager.current().await.is_none());
}

#[tokio::test]
async fn test_teardown_twice_closes_once() {
    let connector = Arc::new(
        MockConnector::new().with_initial_state(ConnectivityState::Connecting),
    );
    let manager = manager_for(&connector);
    manager.initialize().await;

    assert_eq!(manager.teardown().await, TeardownOutcome::Closed);
    assert_eq!(manager.teardown().await, TeardownOutcome::NothingHeld);

    assert_eq!(connector.total_close_calls(), 1);
}

#[tokio::test]
async fn test_teardown_after_failed_close_holds_nothing() {
    let connector = Arc::new(MockConnector::new().with_close_behavior(CloseBehavior::Fail));
    let manager = manager_for(&connector);
    manager.initialize().await;

    let outcome = manager.teardown().await;

    assert!(matches!(outcome, TeardownOutcome::CloseFailed(_)));
    assert!(manager.current().await.is_none());
    assert_eq!(manager.teardown().await, TeardownOutcome::NothingHeld);
}
