//! Blocklist data model and the registry contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::id::ContentId;

/// Caller intent for a block or unblock call. Never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRequest {
    /// Raw references to act on: native paths, gateway URLs, bare domains.
    pub references: Vec<String>,
    /// Why the action is taken. Required, non-empty.
    pub reason: String,
    /// Operator performing the action, if identified.
    pub user: Option<String>,
}

impl BlockRequest {
    /// Builds a request for a single reference.
    pub fn single(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            references: vec![reference.into()],
            reason: reason.into(),
            user: None,
        }
    }

    /// Sets the acting user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// One blocked identifier with its metadata.
///
/// Presence in the registry is what enforcement checks; the entry persists
/// until an explicit unblock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntry {
    /// The blocked identifier.
    pub id: ContentId,
    /// Why it was blocked. Always non-empty.
    pub reason: String,
    /// Operator who blocked it, if identified.
    pub user: Option<String>,
}

/// The kind of a recorded audit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
    /// Identifiers were added to the blocklist.
    Block,
    /// Identifiers were removed from the blocklist.
    Unblock,
}

impl AuditKind {
    /// The action name as rendered in audit output.
    pub fn label(&self) -> &'static str {
        match self {
            AuditKind::Block => "block",
            AuditKind::Unblock => "unblock",
        }
    }

    /// Past-tense verb for error wording.
    pub fn verb(&self) -> &'static str {
        match self {
            AuditKind::Block => "blocked",
            AuditKind::Unblock => "unblocked",
        }
    }
}

/// Immutable, append-only record of one successful mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditAction {
    /// What was done.
    pub kind: AuditKind,
    /// The identifiers the call mutated. Never empty.
    pub ids: Vec<ContentId>,
    /// The reason carried by the request.
    pub reason: String,
    /// The acting user, if identified.
    pub user: Option<String>,
    /// When the action was recorded.
    pub created_at: DateTime<Utc>,
}

impl AuditAction {
    /// Builds an action stamped with the current time.
    pub fn now(
        kind: AuditKind,
        ids: Vec<ContentId>,
        reason: impl Into<String>,
        user: Option<String>,
    ) -> Self {
        Self {
            kind,
            ids,
            reason: reason.into(),
            user,
            created_at: Utc::now(),
        }
    }
}

/// Authoritative block state plus the audit log, reached through a narrow
/// interface so persistence stays an external concern.
///
/// Implementations are shared process-wide and must tolerate concurrent
/// callers; per-identifier operations must not serialize against unrelated
/// identifiers. The registry and the audit log are independently durable:
/// losing one never silently undoes the other.
#[async_trait]
pub trait Blocklist: Send + Sync + 'static {
    /// Marks `id` as blocked.
    ///
    /// Idempotent: returns `Ok(false)` when the identifier was already
    /// present, without mutating state or erroring. Callers use the flag to
    /// exclude the identifier from newly-blocked reporting.
    async fn block(&self, id: &ContentId, entry: BlockEntry) -> CoreResult<bool>;

    /// Removes `id` from the blocklist. Errors when it was not blocked.
    async fn unblock(&self, id: &ContentId) -> CoreResult<()>;

    /// Best-effort eviction of `id` from any secondary cache layer,
    /// independent of the authoritative block state.
    async fn purge(&self, id: &ContentId) -> CoreResult<()>;

    /// Whether `id` is currently blocked.
    async fn contains(&self, id: &ContentId) -> CoreResult<bool>;

    /// Looks up the blocklist entry for `id`.
    async fn search(&self, id: &ContentId) -> CoreResult<Option<BlockEntry>>;

    /// Appends one action to the audit log.
    async fn append_audit(&self, action: AuditAction) -> CoreResult<()>;

    /// Returns up to `limit` audit actions, newest first.
    async fn audit_log(&self, limit: usize) -> CoreResult<Vec<AuditAction>>;
}
