#![warn(missing_docs)]

//! Cordon gate: enforcement interceptors for the store and the router
//!
//! This crate wraps the node's object store and peer-routing layer with
//! interceptors that consult the shared blocklist registry. The storage gate
//! denies reads of blocked identifiers and fails closed; the routing gate
//! denies provide/find-providers through a short-lived TTL cache and fails
//! open on transient registry errors. Writes, removals and plain peer/value
//! operations always pass through unmodified.

pub mod cache;
pub mod router;
pub mod store;

pub use cache::{BlockCheckCache, CacheConfig, CacheStats};
pub use router::{
    ContentRouting, GatedRouter, MemoryRouter, PeerId, ProviderInfo, ProviderStream, RouteError,
    RouteResult,
};
pub use store::{
    GatedStore, MemoryStore, Object, ObjectStore, ObjectStream, StoreError, StoreResult,
    DENIAL_NOTICE,
};
