#![warn(missing_docs)]

//! Cordon core: content identifiers, blocklist data model, registry contract
//!
//! This crate provides the foundational types for the Cordon content-blocking
//! layer. It defines the opaque content identifier, the `/ipfs` and `/ipns`
//! path forms, the blocklist and audit data model, the [`Blocklist`] registry
//! contract, and an in-memory reference implementation of that contract.

pub mod blocklist;
pub mod error;
pub mod id;
pub mod memory;
pub mod path;

pub use blocklist::{AuditAction, AuditKind, BlockEntry, BlockRequest, Blocklist};
pub use error::{CoreError, CoreResult};
pub use id::ContentId;
pub use memory::{MemoryBlocklist, MemoryBlocklistConfig};
pub use path::{ContentPath, PathScheme};
