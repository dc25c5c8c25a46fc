//! Peer-routing enforcement.
//!
//! [`GatedRouter`] wraps any [`ContentRouting`] implementation and refuses to
//! advertise or discover blocked identifiers, consulting the block-check TTL
//! cache before the registry. On a transient registry error this gate fails
//! open: legitimate discovery traffic keeps flowing and the verdict is not
//! cached, so the next call re-queries. Peer lookup and key/value operations
//! pass through unmodified.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use cordon_core::{Blocklist, ContentId};

use crate::cache::BlockCheckCache;

/// Identity of a peer on the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Creates a peer identity from its textual form.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A peer known to provide some content, with its dial addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// The providing peer.
    pub peer: PeerId,
    /// Multiaddress-style dial strings for the peer.
    pub addrs: Vec<String>,
}

/// Result type alias for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;

/// Error variants for routing operations.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The identifier is blocked and will not be advertised.
    #[error("will not provide blocked content {id}")]
    Forbidden {
        /// The blocked identifier.
        id: ContentId,
    },

    /// The requested peer is unknown.
    #[error("peer not found: {peer}")]
    PeerNotFound {
        /// The unknown peer.
        peer: PeerId,
    },

    /// The underlying routing layer failed.
    #[error("routing backend error: {reason}")]
    Backend {
        /// Description of the failure.
        reason: String,
    },
}

/// A finite stream of discovered providers.
pub type ProviderStream = BoxStream<'static, RouteResult<ProviderInfo>>;

/// The peer-routing surface as this layer sees it.
#[async_trait]
pub trait ContentRouting: Send + Sync + 'static {
    /// Advertises the identifier to the network.
    async fn provide(&self, id: &ContentId) -> RouteResult<()>;

    /// Discovers up to `limit` providers for the identifier.
    async fn find_providers(&self, id: &ContentId, limit: usize) -> RouteResult<ProviderStream>;

    /// Looks up a peer's dial information.
    async fn find_peer(&self, peer: &PeerId) -> RouteResult<ProviderInfo>;

    /// Stores a record in the routing system.
    async fn put_value(&self, key: &str, value: Bytes) -> RouteResult<()>;

    /// Fetches a record from the routing system.
    async fn get_value(&self, key: &str) -> RouteResult<Bytes>;
}

/// A [`ContentRouting`] wrapper that refuses provide/find for blocked
/// identifiers.
pub struct GatedRouter<R> {
    inner: R,
    registry: Arc<dyn Blocklist>,
    cache: Arc<BlockCheckCache>,
}

impl<R: ContentRouting> GatedRouter<R> {
    /// Wraps `inner`, consulting `cache` then `registry` before provide and
    /// find-providers calls. The cache is shared process-wide, so several
    /// gates can ride the same verdicts.
    pub fn new(inner: R, registry: Arc<dyn Blocklist>, cache: Arc<BlockCheckCache>) -> Self {
        Self {
            inner,
            registry,
            cache,
        }
    }

    async fn is_blocked(&self, id: &ContentId) -> bool {
        if let Some(blocked) = self.cache.get(id.as_str()) {
            return blocked;
        }
        match self.registry.contains(id).await {
            Ok(blocked) => {
                self.cache.insert(id.as_str().to_string(), blocked);
                if blocked {
                    warn!(id = %id, "tried to provide or find blocked content");
                }
                blocked
            }
            Err(err) => {
                // Fail open, and leave the failure uncached so the next call
                // re-queries the registry.
                debug!(id = %id, error = %err, "block check unavailable, failing open");
                false
            }
        }
    }
}

#[async_trait]
impl<R: ContentRouting> ContentRouting for GatedRouter<R> {
    async fn provide(&self, id: &ContentId) -> RouteResult<()> {
        if self.is_blocked(id).await {
            return Err(RouteError::Forbidden { id: id.clone() });
        }
        self.inner.provide(id).await
    }

    async fn find_providers(&self, id: &ContentId, limit: usize) -> RouteResult<ProviderStream> {
        if self.is_blocked(id).await {
            // An immediately exhausted stream, with no network call.
            return Ok(stream::empty().boxed());
        }
        self.inner.find_providers(id, limit).await
    }

    async fn find_peer(&self, peer: &PeerId) -> RouteResult<ProviderInfo> {
        self.inner.find_peer(peer).await
    }

    async fn put_value(&self, key: &str, value: Bytes) -> RouteResult<()> {
        self.inner.put_value(key, value).await
    }

    async fn get_value(&self, key: &str) -> RouteResult<Bytes> {
        self.inner.get_value(key).await
    }
}

/// In-memory [`ContentRouting`] with call counters, for tests and local runs.
#[derive(Default)]
pub struct MemoryRouter {
    providers: DashMap<ContentId, Vec<ProviderInfo>>,
    peers: DashMap<PeerId, ProviderInfo>,
    values: DashMap<String, Bytes>,
    provides: std::sync::atomic::AtomicU64,
    finds: std::sync::atomic::AtomicU64,
}

impl MemoryRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider for an identifier.
    pub fn add_provider(&self, id: ContentId, provider: ProviderInfo) {
        self.peers
            .insert(provider.peer.clone(), provider.clone());
        self.providers.entry(id).or_default().push(provider);
    }

    /// How many provide calls reached this router.
    pub fn provides(&self) -> u64 {
        self.provides.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// How many find-providers calls reached this router.
    pub fn finds(&self) -> u64 {
        self.finds.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[async_trait]
impl ContentRouting for MemoryRouter {
    async fn provide(&self, _id: &ContentId) -> RouteResult<()> {
        self.provides
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    async fn find_providers(&self, id: &ContentId, limit: usize) -> RouteResult<ProviderStream> {
        self.finds
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let found: Vec<RouteResult<ProviderInfo>> = self
            .providers
            .get(id)
            .map(|list| list.iter().take(limit).cloned().map(Ok).collect())
            .unwrap_or_default();
        Ok(stream::iter(found).boxed())
    }

    async fn find_peer(&self, peer: &PeerId) -> RouteResult<ProviderInfo> {
        self.peers
            .get(peer)
            .map(|info| info.clone())
            .ok_or_else(|| RouteError::PeerNotFound { peer: peer.clone() })
    }

    async fn put_value(&self, key: &str, value: Bytes) -> RouteResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_value(&self, key: &str) -> RouteResult<Bytes> {
        self.values
            .get(key)
            .map(|v| v.clone())
            .ok_or_else(|| RouteError::Backend {
                reason: format!("no record under {}", key),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;

    use futures::StreamExt;

    use cordon_core::{AuditAction, BlockEntry, CoreError, CoreResult, MemoryBlocklist};

    use crate::cache::CacheConfig;

    /// Registry wrapper that counts membership queries and can be told to
    /// fail the next one.
    struct CountingRegistry {
        inner: MemoryBlocklist,
        contains_calls: AtomicU64,
        fail_next: AtomicBool,
    }

    impl CountingRegistry {
        fn new() -> Self {
            Self {
                inner: MemoryBlocklist::new(),
                contains_calls: AtomicU64::new(0),
                fail_next: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Blocklist for CountingRegistry {
        async fn block(&self, id: &ContentId, entry: BlockEntry) -> CoreResult<bool> {
            self.inner.block(id, entry).await
        }
        async fn unblock(&self, id: &ContentId) -> CoreResult<()> {
            self.inner.unblock(id).await
        }
        async fn purge(&self, id: &ContentId) -> CoreResult<()> {
            self.inner.purge(id).await
        }
        async fn contains(&self, id: &ContentId) -> CoreResult<bool> {
            self.contains_calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_next.swap(false, Ordering::Relaxed) {
                return Err(CoreError::Registry {
                    reason: "transient outage".to_string(),
                });
            }
            self.inner.contains(id).await
        }
        async fn search(&self, id: &ContentId) -> CoreResult<Option<BlockEntry>> {
            self.inner.search(id).await
        }
        async fn append_audit(&self, action: AuditAction) -> CoreResult<()> {
            self.inner.append_audit(action).await
        }
        async fn audit_log(&self, limit: usize) -> CoreResult<Vec<AuditAction>> {
            self.inner.audit_log(limit).await
        }
    }

    fn test_id(text: &str) -> ContentId {
        ContentId::parse(text).unwrap()
    }

    async fn block(registry: &CountingRegistry, id: &ContentId) {
        let entry = BlockEntry {
            id: id.clone(),
            reason: "test reason".to_string(),
            user: None,
        };
        registry.inner.block(id, entry).await.unwrap();
    }

    fn gated(
        registry: Arc<CountingRegistry>,
        ttl: Duration,
    ) -> GatedRouter<MemoryRouter> {
        let cache = Arc::new(BlockCheckCache::new(CacheConfig {
            ttl,
            max_entries: 64,
        }));
        GatedRouter::new(MemoryRouter::new(), registry, cache)
    }

    #[tokio::test]
    async fn test_provide_blocked_is_refused_without_network_call() {
        let registry = Arc::new(CountingRegistry::new());
        let id = test_id("QmRoutedObject01");
        block(&registry, &id).await;

        let router = gated(registry, Duration::from_secs(30));
        let err = router.provide(&id).await.unwrap_err();
        assert!(matches!(err, RouteError::Forbidden { .. }));
        assert_eq!(router.inner.provides(), 0);
    }

    #[tokio::test]
    async fn test_provide_unblocked_passes_through() {
        let registry = Arc::new(CountingRegistry::new());
        let router = gated(registry, Duration::from_secs(30));

        router.provide(&test_id("QmRoutedObject01")).await.unwrap();
        assert_eq!(router.inner.provides(), 1);
    }

    #[tokio::test]
    async fn test_find_providers_blocked_returns_empty_stream() {
        let registry = Arc::new(CountingRegistry::new());
        let id = test_id("QmRoutedObject01");
        block(&registry, &id).await;

        let router = gated(registry, Duration::from_secs(30));
        router.inner.add_provider(
            id.clone(),
            ProviderInfo {
                peer: PeerId::new("12D3KooWPeerA"),
                addrs: vec!["/ip4/10.0.0.1/tcp/4001".to_string()],
            },
        );

        let providers: Vec<_> = router
            .find_providers(&id, 20)
            .await
            .unwrap()
            .collect()
            .await;
        assert!(providers.is_empty());
        assert_eq!(router.inner.finds(), 0);
    }

    #[tokio::test]
    async fn test_verdict_is_cached_within_ttl() {
        let registry = Arc::new(CountingRegistry::new());
        let id = test_id("QmRoutedObject01");
        block(&registry, &id).await;

        let router = gated(registry.clone(), Duration::from_secs(30));
        let _ = router.provide(&id).await;
        let _ = router.provide(&id).await;

        // One registry query serves both calls inside the TTL window.
        assert_eq!(registry.contains_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_expired_verdict_triggers_requery() {
        let registry = Arc::new(CountingRegistry::new());
        let id = test_id("QmRoutedObject01");
        block(&registry, &id).await;

        let router = gated(registry.clone(), Duration::from_millis(20));
        let _ = router.provide(&id).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        let _ = router.provide(&id).await;

        assert_eq!(registry.contains_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_registry_error_fails_open_and_is_not_cached() {
        let registry = Arc::new(CountingRegistry::new());
        let id = test_id("QmRoutedObject01");
        block(&registry, &id).await;
        registry.fail_next.store(true, Ordering::Relaxed);

        let router = gated(registry.clone(), Duration::from_secs(30));

        // The failed check lets the call through.
        router.provide(&id).await.unwrap();
        assert_eq!(router.inner.provides(), 1);

        // The failure was not cached: the next call re-queries and enforces.
        let err = router.provide(&id).await.unwrap_err();
        assert!(matches!(err, RouteError::Forbidden { .. }));
        assert_eq!(registry.contains_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_unrelated_operations_pass_through() {
        let registry = Arc::new(CountingRegistry::new());
        let id = test_id("QmRoutedObject01");
        block(&registry, &id).await;

        let router = gated(registry.clone(), Duration::from_secs(30));
        let peer = PeerId::new("12D3KooWPeerA");
        router.inner.add_provider(
            id.clone(),
            ProviderInfo {
                peer: peer.clone(),
                addrs: vec![],
            },
        );

        // Peer lookup and key/value records ignore the blocklist entirely.
        assert!(router.find_peer(&peer).await.is_ok());
        router
            .put_value("/ipns/record", Bytes::from("value"))
            .await
            .unwrap();
        assert_eq!(
            router.get_value("/ipns/record").await.unwrap(),
            Bytes::from("value")
        );
        assert_eq!(registry.contains_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_find_providers_unblocked_yields_results() {
        let registry = Arc::new(CountingRegistry::new());
        let router = gated(registry, Duration::from_secs(30));
        let id = test_id("QmRoutedObject01");
        router.inner.add_provider(
            id.clone(),
            ProviderInfo {
                peer: PeerId::new("12D3KooWPeerA"),
                addrs: vec!["/ip4/10.0.0.1/tcp/4001".to_string()],
            },
        );

        let providers: Vec<_> = router
            .find_providers(&id, 20)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(providers.len(), 1);
    }
}
