//! Storage read-path enforcement.
//!
//! [`GatedStore`] wraps any [`ObjectStore`] and refuses to load blocked
//! identifiers. Enforcement is read-only: writes and removals pass through
//! untouched. Unlike the routing gate, this gate fails closed: when the
//! registry cannot answer, the read is denied.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use thiserror::Error;
use tracing::warn;

use cordon_core::{Blocklist, ContentId};

/// Canned payload served in place of blocked content.
pub const DENIAL_NOTICE: &str =
    "content is unavailable because it violates the operator's terms of service";

/// One stored object: an identifier and its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// The object's content identifier.
    pub id: ContentId,
    /// The object's raw bytes.
    pub data: Bytes,
}

impl Object {
    /// Creates an object from an identifier and its bytes.
    pub fn new(id: ContentId, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error variants for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier is blocked; no content is served.
    #[error("{id}: {}", DENIAL_NOTICE)]
    Forbidden {
        /// The blocked identifier.
        id: ContentId,
    },

    /// No object stored under the identifier.
    #[error("object not found: {id}")]
    NotFound {
        /// The missing identifier.
        id: ContentId,
    },

    /// The blocklist registry could not answer; the read is denied.
    #[error("blocklist registry unavailable, denying read: {reason}")]
    Registry {
        /// Description of the registry failure.
        reason: String,
    },

    /// The underlying store failed.
    #[error("store backend error: {reason}")]
    Backend {
        /// Description of the failure.
        reason: String,
    },
}

/// A finite, cancellable sequence of batch-read results.
///
/// Producers are lazy: dropping the stream stops any in-flight enumeration
/// without leaking background work.
pub type ObjectStream = BoxStream<'static, StoreResult<Object>>;

/// The object store's read/write surface as this layer sees it.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Loads one object.
    async fn get(&self, id: &ContentId) -> StoreResult<Object>;

    /// Loads a batch of objects as a result stream.
    async fn get_many(&self, ids: &[ContentId]) -> StoreResult<ObjectStream>;

    /// Stores one object.
    async fn put(&self, object: Object) -> StoreResult<()>;

    /// Removes one object.
    async fn remove(&self, id: &ContentId) -> StoreResult<()>;

    /// Whether an object is stored under the identifier.
    async fn has(&self, id: &ContentId) -> StoreResult<bool>;
}

/// An [`ObjectStore`] that refuses to load blocked identifiers.
///
/// Composition, not inheritance: delegates every unmodified operation to the
/// wrapped store.
pub struct GatedStore<S> {
    inner: S,
    registry: Arc<dyn Blocklist>,
}

impl<S: ObjectStore> GatedStore<S> {
    /// Wraps `inner`, consulting `registry` on every read.
    pub fn new(inner: S, registry: Arc<dyn Blocklist>) -> Self {
        Self { inner, registry }
    }

    /// The canned object a front end may serve in place of blocked content.
    pub fn denial_notice(id: &ContentId) -> Object {
        Object::new(id.clone(), format!("{}\n", DENIAL_NOTICE))
    }

    async fn check(&self, id: &ContentId) -> StoreResult<()> {
        match self.registry.contains(id).await {
            Ok(false) => Ok(()),
            Ok(true) => {
                warn!(id = %id, "denied read of blocked content");
                Err(StoreError::Forbidden { id: id.clone() })
            }
            // Fail closed: an unanswerable membership check denies the read.
            Err(err) => Err(StoreError::Registry {
                reason: err.to_string(),
            }),
        }
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for GatedStore<S> {
    async fn get(&self, id: &ContentId) -> StoreResult<Object> {
        self.check(id).await?;
        self.inner.get(id).await
    }

    async fn get_many(&self, ids: &[ContentId]) -> StoreResult<ObjectStream> {
        // Every requested identifier is checked before anything is loaded;
        // one result set never mixes allowed and blocked entries.
        for id in ids {
            self.check(id).await?;
        }
        self.inner.get_many(ids).await
    }

    async fn put(&self, object: Object) -> StoreResult<()> {
        self.inner.put(object).await
    }

    async fn remove(&self, id: &ContentId) -> StoreResult<()> {
        self.inner.remove(id).await
    }

    async fn has(&self, id: &ContentId) -> StoreResult<bool> {
        self.inner.has(id).await
    }
}

/// In-memory [`ObjectStore`] with read counters, for tests and local runs.
#[derive(Default)]
pub struct MemoryStore {
    objects: DashMap<ContentId, Bytes>,
    reads: std::sync::atomic::AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many single or batch read calls reached this store.
    pub fn reads(&self) -> u64 {
        self.reads.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, id: &ContentId) -> StoreResult<Object> {
        self.reads
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        match self.objects.get(id) {
            Some(data) => Ok(Object::new(id.clone(), data.clone())),
            None => Err(StoreError::NotFound { id: id.clone() }),
        }
    }

    async fn get_many(&self, ids: &[ContentId]) -> StoreResult<ObjectStream> {
        self.reads
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let results: Vec<StoreResult<Object>> = ids
            .iter()
            .map(|id| match self.objects.get(id) {
                Some(data) => Ok(Object::new(id.clone(), data.clone())),
                None => Err(StoreError::NotFound { id: id.clone() }),
            })
            .collect();
        Ok(stream::iter(results).boxed())
    }

    async fn put(&self, object: Object) -> StoreResult<()> {
        self.objects.insert(object.id, object.data);
        Ok(())
    }

    async fn remove(&self, id: &ContentId) -> StoreResult<()> {
        self.objects.remove(id);
        Ok(())
    }

    async fn has(&self, id: &ContentId) -> StoreResult<bool> {
        Ok(self.objects.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::StreamExt;

    use cordon_core::{BlockEntry, CoreError, CoreResult, MemoryBlocklist};

    fn test_id(text: &str) -> ContentId {
        ContentId::parse(text).unwrap()
    }

    async fn block(registry: &MemoryBlocklist, id: &ContentId) {
        let entry = BlockEntry {
            id: id.clone(),
            reason: "test reason".to_string(),
            user: None,
        };
        registry.block(id, entry).await.unwrap();
    }

    async fn seeded_store(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for text in ids {
            let id = test_id(text);
            store
                .put(Object::new(id, format!("data for {}", text)))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_get_passes_for_unblocked() {
        let registry = Arc::new(MemoryBlocklist::new());
        let store = GatedStore::new(seeded_store(&["QmStoredObject1"]).await, registry);

        let object = store.get(&test_id("QmStoredObject1")).await.unwrap();
        assert_eq!(object.data, Bytes::from("data for QmStoredObject1"));
    }

    #[tokio::test]
    async fn test_get_blocked_is_forbidden_without_touching_store() {
        let registry = Arc::new(MemoryBlocklist::new());
        let id = test_id("QmStoredObject1");
        block(&registry, &id).await;

        let inner = seeded_store(&["QmStoredObject1"]).await;
        let store = GatedStore::new(inner, registry);

        let err = store.get(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::Forbidden { .. }));
        assert_eq!(store.inner.reads(), 0);
    }

    #[tokio::test]
    async fn test_get_many_aborts_on_first_blocked() {
        let registry = Arc::new(MemoryBlocklist::new());
        let blocked = test_id("QmStoredObject2");
        block(&registry, &blocked).await;

        let inner = seeded_store(&["QmStoredObject1", "QmStoredObject2", "QmStoredObject3"]).await;
        let store = GatedStore::new(inner, registry);

        let ids = [
            test_id("QmStoredObject1"),
            test_id("QmStoredObject2"),
            test_id("QmStoredObject3"),
        ];
        let err = store.get_many(&ids).await.err().unwrap();
        assert!(matches!(err, StoreError::Forbidden { id } if id == blocked));
        assert_eq!(store.inner.reads(), 0);
    }

    #[tokio::test]
    async fn test_get_many_streams_when_nothing_blocked() {
        let registry = Arc::new(MemoryBlocklist::new());
        let inner = seeded_store(&["QmStoredObject1", "QmStoredObject2"]).await;
        let store = GatedStore::new(inner, registry);

        let ids = [test_id("QmStoredObject1"), test_id("QmStoredObject2")];
        let results: Vec<_> = store.get_many(&ids).await.unwrap().collect().await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn test_registry_error_fails_closed() {
        struct BrokenRegistry;

        #[async_trait]
        impl Blocklist for BrokenRegistry {
            async fn block(&self, _: &ContentId, _: BlockEntry) -> CoreResult<bool> {
                unreachable!()
            }
            async fn unblock(&self, _: &ContentId) -> CoreResult<()> {
                unreachable!()
            }
            async fn purge(&self, _: &ContentId) -> CoreResult<()> {
                unreachable!()
            }
            async fn contains(&self, _: &ContentId) -> CoreResult<bool> {
                Err(CoreError::Registry {
                    reason: "registry down".to_string(),
                })
            }
            async fn search(&self, _: &ContentId) -> CoreResult<Option<BlockEntry>> {
                unreachable!()
            }
            async fn append_audit(&self, _: cordon_core::AuditAction) -> CoreResult<()> {
                unreachable!()
            }
            async fn audit_log(&self, _: usize) -> CoreResult<Vec<cordon_core::AuditAction>> {
                unreachable!()
            }
        }

        let store = GatedStore::new(
            seeded_store(&["QmStoredObject1"]).await,
            Arc::new(BrokenRegistry),
        );
        let err = store.get(&test_id("QmStoredObject1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Registry { .. }));
        assert_eq!(store.inner.reads(), 0);
    }

    #[tokio::test]
    async fn test_writes_and_removals_are_never_intercepted() {
        let registry = Arc::new(MemoryBlocklist::new());
        let id = test_id("QmStoredObject1");
        block(&registry, &id).await;

        let store = GatedStore::new(MemoryStore::new(), registry);

        // A blocked identifier can still be written and removed.
        store
            .put(Object::new(id.clone(), "payload"))
            .await
            .unwrap();
        assert!(store.has(&id).await.unwrap());
        store.remove(&id).await.unwrap();
        assert!(!store.has(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_denial_notice_payload() {
        let id = test_id("QmStoredObject1");
        let notice = GatedStore::<MemoryStore>::denial_notice(&id);
        assert_eq!(notice.id, id);
        assert!(std::str::from_utf8(&notice.data)
            .unwrap()
            .contains("terms of service"));
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_enumeration() {
        let registry = Arc::new(MemoryBlocklist::new());
        let inner = seeded_store(&["QmStoredObject1", "QmStoredObject2"]).await;
        let store = GatedStore::new(inner, registry);

        let ids = [test_id("QmStoredObject1"), test_id("QmStoredObject2")];
        let mut stream = store.get_many(&ids).await.unwrap();
        let first = stream.next().await.unwrap();
        assert!(first.is_ok());
        drop(stream);
    }
}
