//! Integration tests for connection establishment and recovery.

use cellname::store::memory::MemoryStore;
use cellname::{Cellname, Config, Coordinate, Endpoint, Error, ServiceState, ServiceStatus};
use std::sync::Arc;
use std::time::Duration;

fn client(store: &MemoryStore) -> Cellname {
    let mut config = Config::new("test");
    // Keep recovery fast enough for tests.
    config.reconnect_deadline_ms = 300;
    Cellname::new(config, Arc::new(store.clone()))
}

#[tokio::test]
async fn test_connect_times_out_when_store_never_answers() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    let store = MemoryStore::new();
    store.hold_connections(true);
    let cn = client(&store);

    let err = cn
        .connect_with_timeout(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CouldNotConnectToStorage(_)));
}

#[tokio::test]
async fn test_resolve_connection_problems_is_idempotent_when_connected() {
    let store = MemoryStore::new();
    let cn = client(&store);
    cn.connect_with_timeout(Duration::from_secs(5))
        .await
        .unwrap();

    let sessions_before = store.live_session_count();
    assert!(cn.resolve_connection_problems().await.unwrap());
    // Already connected: no new session was opened.
    assert_eq!(store.live_session_count(), sessions_before);
}

#[tokio::test]
async fn test_reconnect_after_session_expiry() {
    let store = MemoryStore::new();
    let cn = client(&store);
    cn.connect_with_timeout(Duration::from_secs(5))
        .await
        .unwrap();

    let coordinate = Coordinate::new(1, "search", "ops", "dc1").unwrap();
    cn.create_coordinate(&coordinate).await.unwrap();
    let mut handle = cn.claim(coordinate.clone()).await.unwrap();
    handle
        .put_endpoint(Endpoint::new("http", "node1", 8080, "http"))
        .await
        .unwrap();

    store.expire_all_sessions();

    // The dead session fails operations and took the claim with it.
    let err = handle
        .set_status(ServiceStatus::new(ServiceState::Running, "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(!store.has_node("/cn/dc1/ops/search/1/status"));

    assert!(cn.resolve_connection_problems().await.unwrap());

    // Back in business on the replacement session: the coordinate is
    // free again and resolvers see the fresh claim.
    let mut handle = cn.claim(coordinate).await.unwrap();
    handle
        .put_endpoint(Endpoint::new("http", "node1", 8080, "http"))
        .await
        .unwrap();
    let resolved = cn.resolver().resolve("all.search.ops.dc1").await.unwrap();
    assert_eq!(resolved.len(), 1);
}

#[tokio::test]
async fn test_reconnect_reports_failure_when_store_stays_down() {
    let store = MemoryStore::new();
    let cn = client(&store);
    cn.connect_with_timeout(Duration::from_secs(5))
        .await
        .unwrap();

    store.expire_all_sessions();
    store.hold_connections(true);

    // Bounded attempt, reported as a plain false rather than an error.
    assert!(!cn.resolve_connection_problems().await.unwrap());
}

#[tokio::test]
async fn test_auth_failure_is_fatal() {
    let store = MemoryStore::new();
    store.fail_auth(true);
    let cn = client(&store);

    let err = cn
        .connect_with_timeout(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CouldNotConnectToStorage(_)));

    let err = cn.resolve_connection_problems().await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_close_drops_claims() {
    let store = MemoryStore::new();
    let cn = client(&store);
    cn.connect_with_timeout(Duration::from_secs(5))
        .await
        .unwrap();

    let coordinate = Coordinate::new(1, "search", "ops", "dc1").unwrap();
    cn.create_coordinate(&coordinate).await.unwrap();
    let _handle = cn.claim(coordinate).await.unwrap();
    assert!(store.has_node("/cn/dc1/ops/search/1/status"));

    cn.close().await.unwrap();
    assert!(!store.has_node("/cn/dc1/ops/search/1/status"));
}

#[tokio::test]
async fn test_close_before_connect_is_invalid() {
    let store = MemoryStore::new();
    let cn = client(&store);
    assert!(matches!(cn.close().await, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_operations_require_connect() {
    let store = MemoryStore::new();
    let cn = client(&store);
    let coordinate = Coordinate::new(1, "search", "ops", "dc1").unwrap();

    assert!(matches!(
        cn.create_coordinate(&coordinate).await,
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(
        cn.resolver().resolve("all.search.ops.dc1").await,
        Err(Error::InvalidState(_))
    ));
}
