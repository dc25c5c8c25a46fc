//! TTL cache for block-membership checks.
//!
//! The routing gate consults this cache before the registry so that hot
//! identifiers cost one membership query per TTL window instead of one per
//! provide/find call. The cache is purely a performance layer and never the
//! source of truth; entries expire lazily on access and a periodic sweep is
//! optional.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for the block-check cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a cached verdict stays valid (default 30 seconds).
    pub ttl: Duration,
    /// Maximum number of cached identifiers (default 65536).
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            max_entries: 65_536,
        }
    }
}

/// Counter snapshot for the block-check cache.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from a fresh entry.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Verdicts stored.
    pub insertions: u64,
    /// Entries dropped because their TTL had passed.
    pub expirations: u64,
}

impl CacheStats {
    /// Hit rate as a ratio of hits to total lookups, 0.0 when idle.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Slot {
    blocked: bool,
    expires_at: Instant,
}

/// Process-wide TTL cache of block verdicts, keyed by the identifier's
/// textual form. Internally synchronized; shared by reference.
pub struct BlockCheckCache {
    entries: DashMap<String, Slot>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    expirations: AtomicU64,
}

impl BlockCheckCache {
    /// Creates a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: config.ttl,
            max_entries: config.max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Returns the cached verdict for `key`, expiring a stale entry lazily.
    pub fn get(&self, key: &str) -> Option<bool> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(slot) => {
                if slot.expires_at > now {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(slot.blocked);
                }
                true
            }
        };
        if expired {
            self.entries.remove(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores a verdict for `key` for one TTL window.
    ///
    /// The cache is advisory: when it is full and a sweep frees nothing, the
    /// verdict is simply not cached and the next lookup re-queries.
    pub fn insert(&self, key: String, blocked: bool) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.sweep();
            if self.entries.len() >= self.max_entries {
                debug!(key = %key, "block-check cache full, skipping insert");
                return;
            }
        }
        self.entries.insert(
            key,
            Slot {
                blocked,
                expires_at: Instant::now() + self.ttl,
            },
        );
        self.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.expires_at > now);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "swept expired block-check entries");
        }
        removed
    }

    /// Number of cached verdicts, expired entries included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

impl Default for BlockCheckCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
