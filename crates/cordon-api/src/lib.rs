//! Cordon API: reference normalization, content resolution, orchestration
//!
//! This crate turns raw operator references (gateway URLs, subdomain hosts,
//! bare domains, native content/name paths) into canonical content
//! identifiers and drives the block/unblock/purge/search pipeline against a
//! [`cordon_core::Blocklist`] registry.

pub mod api;
pub mod normalize;
pub mod resolve;

pub use api::{BatchError, BlockOutcome, Cordon, ItemFailure, UnblockOutcome};
pub use normalize::{normalize, sanitize};
pub use resolve::{
    ContentSource, LiteralSource, ResolvedContent, Resolver, SourceError, DEFAULT_RESOLVE_TIMEOUT,
};
