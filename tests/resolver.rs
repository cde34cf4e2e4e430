//! Integration tests for strategy-based resolution.

use anyhow::Result;
use cellname::store::memory::MemoryStore;
use cellname::store::StoreConnector;
use cellname::{Cellname, Config, Coordinate, Endpoint, Error, ServiceHandle};
use std::sync::Arc;
use std::time::Duration;

async fn connected_client(store: &MemoryStore) -> Cellname {
    let cn = Cellname::new(Config::new("test"), Arc::new(store.clone()));
    cn.connect_with_timeout(Duration::from_secs(5))
        .await
        .unwrap();
    cn
}

/// Claims `instance.service.user.cell` and publishes the named endpoints.
async fn claim_with_endpoints(
    cn: &Cellname,
    instance: u32,
    service: &str,
    user: &str,
    cell: &str,
    endpoints: &[&str],
) -> Result<ServiceHandle> {
    let coordinate = Coordinate::new(instance, service, user, cell)?;
    cn.create_coordinate(&coordinate).await?;
    let mut handle = cn.claim(coordinate).await?;
    let endpoints = endpoints
        .iter()
        .enumerate()
        .map(|(i, name)| Endpoint::new(*name, "node1", 8000 + i as u16, "tcp"))
        .collect();
    handle.put_endpoints(endpoints).await?;
    Ok(handle)
}

#[tokio::test]
async fn test_all_returns_every_matching_claim() -> Result<()> {
    let store = MemoryStore::new();
    let cn = connected_client(&store).await;
    let _h1 = claim_with_endpoints(&cn, 1, "search", "ops", "dc1", &["http", "admin"]).await?;
    let _h2 = claim_with_endpoints(&cn, 2, "search", "ops", "dc1", &["admin"]).await?;

    let resolved = cn.resolver().resolve("all.search.ops.dc1").await?;
    assert_eq!(resolved.len(), 3);
    // Ordered by coordinate, then endpoint name.
    assert_eq!(resolved[0].coordinate.instance(), 1);
    assert_eq!(resolved[0].endpoint.name(), "admin");
    assert_eq!(resolved[1].coordinate.instance(), 1);
    assert_eq!(resolved[1].endpoint.name(), "http");
    assert_eq!(resolved[2].coordinate.instance(), 2);
    assert_eq!(resolved[2].endpoint.name(), "admin");
    Ok(())
}

#[tokio::test]
async fn test_any_with_endpoint_filter() -> Result<()> {
    let store = MemoryStore::new();
    let cn = connected_client(&store).await;
    let _h1 = claim_with_endpoints(&cn, 1, "search", "ops", "dc1", &["http", "admin"]).await?;
    let _h2 = claim_with_endpoints(&cn, 2, "search", "ops", "dc1", &["admin"]).await?;

    // Only instance 1 publishes "http".
    let resolved = cn.resolver().resolve("http.any.search.ops.dc1").await?;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].coordinate.instance(), 1);
    assert_eq!(resolved[0].endpoint.name(), "http");

    // Unfiltered Any yields one endpoint per instance.
    let resolved = cn.resolver().resolve("any.search.ops.dc1").await?;
    assert_eq!(resolved.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_exact_instance() -> Result<()> {
    let store = MemoryStore::new();
    let cn = connected_client(&store).await;
    let _h1 = claim_with_endpoints(&cn, 1, "search", "ops", "dc1", &["http"]).await?;
    let _h2 = claim_with_endpoints(&cn, 2, "search", "ops", "dc1", &["http"]).await?;

    let resolved = cn.resolver().resolve("2.search.ops.dc1").await?;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].coordinate.instance(), 2);

    let resolved = cn.resolver().resolve("http.1.search.ops.dc1").await?;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].coordinate.instance(), 1);
    Ok(())
}

#[tokio::test]
async fn test_field_wildcards_cross_cells() -> Result<()> {
    let store = MemoryStore::new();
    let cn = connected_client(&store).await;
    let _h1 = claim_with_endpoints(&cn, 1, "search", "ops", "dc1", &["http"]).await?;
    let _h2 = claim_with_endpoints(&cn, 1, "search", "ops", "dc2", &["http"]).await?;
    let _h3 = claim_with_endpoints(&cn, 1, "billing", "ops", "dc1", &["http"]).await?;

    let resolved = cn.resolver().resolve("all.search.ops.*").await?;
    assert_eq!(resolved.len(), 2);
    let cells: Vec<&str> = resolved.iter().map(|r| r.coordinate.cell()).collect();
    assert_eq!(cells, vec!["dc1", "dc2"]);

    let resolved = cn.resolver().resolve("all.*.ops.dc1").await?;
    assert_eq!(resolved.len(), 2);
    let services: Vec<&str> = resolved.iter().map(|r| r.coordinate.service()).collect();
    assert_eq!(services, vec!["billing", "search"]);
    Ok(())
}

#[tokio::test]
async fn test_unclaimed_coordinates_are_skipped() -> Result<()> {
    let store = MemoryStore::new();
    let cn = connected_client(&store).await;
    let _h1 = claim_with_endpoints(&cn, 1, "search", "ops", "dc1", &["http"]).await?;
    // Instance 2 exists but nobody claimed it.
    cn.create_coordinate(&Coordinate::new(2, "search", "ops", "dc1")?)
        .await?;

    let resolved = cn.resolver().resolve("all.search.ops.dc1").await?;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].coordinate.instance(), 1);
    Ok(())
}

#[tokio::test]
async fn test_empty_namespace_resolves_to_nothing() -> Result<()> {
    let store = MemoryStore::new();
    let cn = connected_client(&store).await;

    let resolved = cn.resolver().resolve("all.search.ops.dc1").await?;
    assert!(resolved.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_record_is_skipped() -> Result<()> {
    let store = MemoryStore::new();
    let cn = connected_client(&store).await;
    let _h1 = claim_with_endpoints(&cn, 1, "search", "ops", "dc1", &["http"]).await?;
    let _h2 = claim_with_endpoints(&cn, 2, "search", "ops", "dc1", &["http"]).await?;

    // Garbage lands in instance 2's record.
    let (events, _rx) = tokio::sync::mpsc::channel(4);
    let raw = store.open(events).await.unwrap();
    let path = "/cn/dc1/ops/search/2/status";
    let (_, version) = raw.read(path).await?;
    raw.write(path, b"garbage".to_vec(), version).await?;

    let resolved = cn.resolver().resolve("all.search.ops.dc1").await?;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].coordinate.instance(), 1);
    Ok(())
}

#[tokio::test]
async fn test_malformed_expressions_rejected() {
    let store = MemoryStore::new();
    let cn = connected_client(&store).await;

    for bad in ["", "search.ops.dc1", "bogus.search.ops.dc1", "a.b.c.d.e.f"] {
        let err = cn.resolver().resolve(bad).await.unwrap_err();
        assert!(
            matches!(err, Error::InvalidResolverExpression(_)),
            "expected rejection for {:?}",
            bad
        );
    }
}
