//! Concurrent access to the shared client.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use zk_session::client::MockConnector;
use zk_session::{ConnectionManager, TeardownOutcome};

use super::manager_for;

const CALLERS: usize = 16;

async fn call_concurrently(manager: &Arc<ConnectionManager>) -> Vec<Option<i64>> {
    let tasks = (0..CALLERS).map(|_| {
        let manager = Arc::clone(manager);
        tokio::spawn(async move {
            manager
                .get_or_create()
                .await
                .map(|client| client.session_id())
        })
    });

    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("caller task panicked"))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_construction() {
    let connector = Arc::new(MockConnector::new().with_connect_delay(Duration::from_millis(50)));
    let manager = Arc::new(manager_for(&connector));

    let sessions = call_concurrently(&manager).await;

    assert_eq!(connector.connect_attempts(), 1);
    let first = sessions[0].expect("client should be built");
    assert!(sessions.iter().all(|s| *s == Some(first)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_all_see_absent_on_failure() {
    let connector = Arc::new(MockConnector::new().with_connect_delay(Duration::from_millis(5)));
    connector.set_failing(true);
    let manager = Arc::new(manager_for(&connector));

    let sessions = call_concurrently(&manager).await;

    assert!(sessions.iter().all(Option::is_none));
    // Each caller retries in turn; constructions never overlap.
    assert_eq!(connector.connect_attempts(), CALLERS);
    assert_eq!(connector.peak_concurrent_connects(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_after_expiry_rebuild_once() {
    let connector = Arc::new(MockConnector::new().with_connect_delay(Duration::from_millis(20)));
    let manager = Arc::new(manager_for(&connector));

    let original = manager.get_or_create().await.unwrap().session_id();
    connector.last_issued().unwrap().expire();

    let sessions = call_concurrently(&manager).await;

    assert_eq!(connector.connect_attempts(), 2);
    assert_eq!(connector.peak_concurrent_connects(), 1);
    let rebuilt = sessions[0].unwrap();
    assert_ne!(rebuilt, original);
    assert!(sessions.iter().all(|s| *s == Some(rebuilt)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_teardown_during_access_leaves_nothing_held() {
    let connector = Arc::new(MockConnector::new().with_connect_delay(Duration::from_millis(10)));
    let manager = Arc::new(manager_for(&connector));
    manager.initialize().await;

    let callers = call_concurrently(&manager);
    let teardown = manager.teardown();
    let (_, outcome) = tokio::join!(callers, teardown);

    assert_eq!(outcome, TeardownOutcome::Closed);
    assert!(manager.current().await.is_none());
    assert!(manager.is_stopped());
    assert_eq!(connector.total_close_calls(), 1);
    assert_eq!(connector.connect_attempts(), 1);
}
