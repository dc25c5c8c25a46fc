use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use cordon_api::{Cordon, LiteralSource, Resolver};
use cordon_core::{BlockRequest, Blocklist, ContentId, MemoryBlocklist};
use cordon_gate::{
    BlockCheckCache, CacheConfig, ContentRouting, GatedRouter, GatedStore, MemoryRouter,
    MemoryStore, Object, ObjectStore, RouteError, StoreError,
};

/// One node's worth of blocking infrastructure: the orchestrator and both
/// enforcement gates share the registry, the way a daemon wires them at
/// startup.
struct Node {
    api: Cordon,
    store: GatedStore<MemoryStore>,
    router: GatedRouter<MemoryRouter>,
}

fn node() -> Node {
    let registry: Arc<dyn Blocklist> = Arc::new(MemoryBlocklist::new());
    let resolver = Resolver::new(Arc::new(LiteralSource::new()));
    let api = Cordon::new(registry.clone(), resolver);
    let cache = Arc::new(BlockCheckCache::new(CacheConfig {
        ttl: Duration::from_secs(30),
        max_entries: 1024,
    }));
    let store = GatedStore::new(MemoryStore::new(), registry.clone());
    let router = GatedRouter::new(MemoryRouter::new(), registry, cache);
    Node { api, store, router }
}

fn request(reference: &str) -> BlockRequest {
    BlockRequest::single(reference, "integration test").with_user("ops")
}

fn id(text: &str) -> ContentId {
    ContentId::parse(text).unwrap()
}

#[tokio::test]
async fn test_block_is_enforced_on_the_read_path() {
    let node = node();
    let target = id("QmPipelineObj001");
    node.store
        .put(Object::new(target.clone(), "payload"))
        .await
        .unwrap();

    // Readable before the block.
    assert!(node.store.get(&target).await.is_ok());

    node.api
        .block(&request("/ipfs/QmPipelineObj001"))
        .await
        .unwrap();

    // Denied immediately after, even though the object is still stored.
    let err = node.store.get(&target).await.unwrap_err();
    assert!(matches!(err, StoreError::Forbidden { .. }));
    assert!(node.store.has(&target).await.unwrap());
}

#[tokio::test]
async fn test_block_is_enforced_on_the_routing_path() {
    let node = node();
    let target = id("QmPipelineObj001");

    node.api
        .block(&request("/ipfs/QmPipelineObj001"))
        .await
        .unwrap();

    let err = node.router.provide(&target).await.unwrap_err();
    assert!(matches!(err, RouteError::Forbidden { .. }));

    let providers: Vec<_> = node
        .router
        .find_providers(&target, 10)
        .await
        .unwrap()
        .collect()
        .await;
    assert!(providers.is_empty());
}

#[tokio::test]
async fn test_stale_allow_verdict_expires_after_ttl() {
    // A provide before the block caches an allow verdict; enforcement on the
    // routing path starts once that verdict ages out.
    let registry: Arc<dyn Blocklist> = Arc::new(MemoryBlocklist::new());
    let resolver = Resolver::new(Arc::new(LiteralSource::new()));
    let api = Cordon::new(registry.clone(), resolver);
    let cache = Arc::new(BlockCheckCache::new(CacheConfig {
        ttl: Duration::from_millis(200),
        max_entries: 1024,
    }));
    let router = GatedRouter::new(MemoryRouter::new(), registry, cache);
    let target = id("QmPipelineObj001");

    router.provide(&target).await.unwrap();
    api.block(&request("/ipfs/QmPipelineObj001")).await.unwrap();

    // Still allowed while the cached verdict is fresh.
    router.provide(&target).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    let err = router.provide(&target).await.unwrap_err();
    assert!(matches!(err, RouteError::Forbidden { .. }));
}

#[tokio::test]
async fn test_unblock_restores_both_paths() {
    let node = node();
    let target = id("QmPipelineObj001");
    node.store
        .put(Object::new(target.clone(), "payload"))
        .await
        .unwrap();

    node.api
        .block(&request("/ipfs/QmPipelineObj001"))
        .await
        .unwrap();
    assert!(node.store.get(&target).await.is_err());

    let outcome = node
        .api
        .unblock(&request("/ipfs/QmPipelineObj001"))
        .await
        .unwrap();
    assert_eq!(outcome.unblocked, vec![target.clone()]);

    assert!(node.store.get(&target).await.is_ok());
}

#[tokio::test]
async fn test_batch_read_refuses_mixed_results() {
    let node = node();
    let allowed = id("QmPipelineObj001");
    let blocked = id("QmPipelineObj002");
    for target in [&allowed, &blocked] {
        node.store
            .put(Object::new(target.clone(), "payload"))
            .await
            .unwrap();
    }

    node.api
        .block(&request("/ipfs/QmPipelineObj002"))
        .await
        .unwrap();

    let err = node
        .store
        .get_many(&[allowed.clone(), blocked.clone()])
        .await
        .err()
        .unwrap();
    assert!(matches!(err, StoreError::Forbidden { .. }));

    // The allowed identifier alone still streams.
    let results: Vec<_> = node
        .store
        .get_many(&[allowed])
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(results.len(), 1);
    assert!(results[0].is_ok());
}

#[tokio::test]
async fn test_audit_trail_reflects_the_pipeline() {
    let node = node();

    node.api
        .block(&request("/ipfs/QmPipelineObj001"))
        .await
        .unwrap();
    node.api
        .block(&request("/ipfs/QmPipelineObj002"))
        .await
        .unwrap();
    node.api
        .unblock(&request("/ipfs/QmPipelineObj001"))
        .await
        .unwrap();

    let log = node.api.audit_log(10).await.unwrap();
    assert_eq!(log.len(), 3);
    // Newest first: the unblock tops the log.
    assert_eq!(log[0].ids, vec![id("QmPipelineObj001")]);
    assert!(log.iter().all(|action| !action.ids.is_empty()));
    assert!(log.iter().all(|action| action.reason == "integration test"));
}
