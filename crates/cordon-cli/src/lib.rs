//! Cordon CLI: operator commands against the blocking layer
//!
//! The `cordon` binary exposes block/unblock/purge/search/audit over a
//! locally assembled service: the in-memory registry plus the literal
//! content source, so direct `/ipfs/<id>` references work without a
//! connected node. Wiring the same commands to a remote daemon replaces only
//! the assembly in [`cli`].

pub mod cli;
pub mod config;
pub mod render;

pub use cli::{Cli, Command};
pub use config::CordonConfig;
