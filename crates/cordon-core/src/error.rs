//! Shared error taxonomy for the blocking layer.

use thiserror::Error;

use crate::blocklist::AuditKind;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Error variants shared across the blocking layer.
///
/// Per-item conditions (invalid reference, resolution failure) are collected
/// into batch outcomes by the orchestrator rather than aborting a batch;
/// [`CoreError::ReasonRequired`] is the only variant that fails a call before
/// any side effect.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A block or unblock request arrived without a reason.
    #[error("a reason is needed to block content")]
    ReasonRequired,

    /// The caller-supplied reference is malformed or unrecognized.
    #[error("invalid content reference: {reason}")]
    InvalidReference {
        /// What made the reference invalid.
        reason: String,
    },

    /// The underlying store or name system failed during lookup.
    #[error("content resolution failed: {reason}")]
    Resolve {
        /// Description of the failure.
        reason: String,
    },

    /// Resolution exceeded its fixed time bound.
    #[error("content resolution timed out after {secs}s")]
    ResolveTimeout {
        /// The bound that was exceeded, in seconds.
        secs: u64,
    },

    /// The blocklist registry failed.
    #[error("blocklist registry error: {reason}")]
    Registry {
        /// Description of the failure.
        reason: String,
    },

    /// The audit store failed on read or write.
    #[error("audit log error: {reason}")]
    Audit {
        /// Description of the failure.
        reason: String,
    },

    /// The registry mutation succeeded but the audit record did not land.
    ///
    /// The wording is deliberate: callers must never read this as the
    /// mutation having failed.
    #[error("content was {}, but the action was not added to the audit log: {reason}", .done.verb())]
    AuditFailed {
        /// The mutation that did succeed.
        done: AuditKind,
        /// Why the audit append failed.
        reason: String,
    },

    /// A secondary-cache purge failed after a successful block.
    ///
    /// The identifier stays blocked; only the eviction is outstanding.
    #[error("error encountered while purging secondary caches: {reason}")]
    PurgeFailed {
        /// Description of the failure.
        reason: String,
    },
}
