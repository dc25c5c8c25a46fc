//! In-memory registry and audit store.
//!
//! Reference implementation of the [`Blocklist`] contract, used by tests and
//! by the CLI's local mode. Entries are sharded so per-identifier operations
//! never serialize against unrelated identifiers; the audit buffer is bounded
//! and drops its oldest records past capacity.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::blocklist::{AuditAction, BlockEntry, Blocklist};
use crate::error::{CoreError, CoreResult};
use crate::id::ContentId;

/// Configuration for the in-memory registry.
#[derive(Debug, Clone)]
pub struct MemoryBlocklistConfig {
    /// Maximum retained audit actions (default 10 000).
    pub audit_capacity: usize,
}

impl Default for MemoryBlocklistConfig {
    fn default() -> Self {
        Self {
            audit_capacity: 10_000,
        }
    }
}

/// In-memory [`Blocklist`] implementation.
pub struct MemoryBlocklist {
    entries: DashMap<ContentId, BlockEntry>,
    purges: DashMap<ContentId, u64>,
    audit: Mutex<VecDeque<AuditAction>>,
    audit_capacity: usize,
    audit_dropped: AtomicU64,
}

impl MemoryBlocklist {
    /// Creates a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MemoryBlocklistConfig::default())
    }

    /// Creates a registry with the given configuration.
    pub fn with_config(config: MemoryBlocklistConfig) -> Self {
        Self {
            entries: DashMap::new(),
            purges: DashMap::new(),
            audit: Mutex::new(VecDeque::with_capacity(config.audit_capacity.min(1024))),
            audit_capacity: config.audit_capacity,
            audit_dropped: AtomicU64::new(0),
        }
    }

    /// Number of blocked identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is blocked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many purge requests `id` has received.
    pub fn purge_count(&self, id: &ContentId) -> u64 {
        self.purges.get(id).map(|c| *c).unwrap_or(0)
    }

    /// Number of audit actions dropped to the capacity bound.
    pub fn audit_dropped(&self) -> u64 {
        self.audit_dropped.load(Ordering::Relaxed)
    }
}

impl Default for MemoryBlocklist {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Blocklist for MemoryBlocklist {
    async fn block(&self, id: &ContentId, entry: BlockEntry) -> CoreResult<bool> {
        if entry.reason.is_empty() {
            return Err(CoreError::Registry {
                reason: "refusing to store a blocklist entry without a reason".to_string(),
            });
        }
        match self.entries.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(entry);
                debug!(id = %id, "blocked identifier");
                Ok(true)
            }
        }
    }

    async fn unblock(&self, id: &ContentId) -> CoreResult<()> {
        match self.entries.remove(id) {
            Some(_) => {
                debug!(id = %id, "unblocked identifier");
                Ok(())
            }
            None => Err(CoreError::Registry {
                reason: format!("{} is not blocked", id),
            }),
        }
    }

    async fn purge(&self, id: &ContentId) -> CoreResult<()> {
        *self.purges.entry(id.clone()).or_insert(0) += 1;
        debug!(id = %id, "purged secondary caches");
        Ok(())
    }

    async fn contains(&self, id: &ContentId) -> CoreResult<bool> {
        Ok(self.entries.contains_key(id))
    }

    async fn search(&self, id: &ContentId) -> CoreResult<Option<BlockEntry>> {
        Ok(self.entries.get(id).map(|e| e.clone()))
    }

    async fn append_audit(&self, action: AuditAction) -> CoreResult<()> {
        if action.ids.is_empty() {
            return Err(CoreError::Audit {
                reason: "audit action lists no identifiers".to_string(),
            });
        }
        let mut log = self.audit.lock();
        if log.len() >= self.audit_capacity {
            log.pop_front();
            self.audit_dropped.fetch_add(1, Ordering::Relaxed);
        }
        log.push_back(action);
        Ok(())
    }

    async fn audit_log(&self, limit: usize) -> CoreResult<Vec<AuditAction>> {
        let log = self.audit.lock();
        Ok(log.iter().rev().take(limit).cloned().collect())
    }
}
