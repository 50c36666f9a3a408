//! Cache Statistics Module
//!
//! Lifetime usage counters for the store: hits, misses, evictions and the
//! rest, globally and per content type. Pure bookkeeping; updated
//! synchronously by the store and never performs I/O itself.

use std::collections::HashMap;

use serde::Serialize;

use crate::cache::namespace::ContentType;

// == Per-Type Counters ==
/// Hit/miss counters attributed to one content type.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TypeStats {
    pub hits: u64,
    pub misses: u64,
}

// == Cache Stats ==
/// Lifetime cache counters plus a point-in-time view of store occupancy.
///
/// Counters describe the whole lifetime of the store; `clear()` on the
/// store does not reset them. `total_entries`, `estimated_bytes` and
/// `degraded` are filled in when a snapshot is taken.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Successful lookups
    pub hits: u64,
    /// Failed lookups (key absent or expired)
    pub misses: u64,
    /// Entries removed by LRU eviction
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Store operations: set / remove
    pub sets: u64,
    pub removes: u64,
    /// Lookups satisfied by the distributed backend after a local miss
    pub backend_hits: u64,
    /// Failed backend calls (the store then degrades to local-only)
    pub backend_errors: u64,
    /// Hit/miss counters broken down by content type
    pub by_type: HashMap<ContentType, TypeStats>,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// Estimated memory footprint of all entries in bytes
    pub estimated_bytes: usize,
    /// Whether the store is currently running without its backend
    pub degraded: bool,
}

impl CacheStats {
    // == Constructor ==
    /// Creates stats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 when no lookups have happened.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Counts a successful lookup, optionally attributed to a content type.
    pub fn record_hit(&mut self, kind: Option<ContentType>) {
        self.hits += 1;
        if let Some(kind) = kind {
            self.by_type.entry(kind).or_default().hits += 1;
        }
    }

    // == Record Miss ==
    /// Counts a failed lookup, optionally attributed to a content type.
    pub fn record_miss(&mut self, kind: Option<ContentType>) {
        self.misses += 1;
        if let Some(kind) = kind {
            self.by_type.entry(kind).or_default().misses += 1;
        }
    }

    // == Record Eviction ==
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Expiration ==
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    // == Record Set / Remove ==
    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_remove(&mut self) {
        self.removes += 1;
    }

    // == Record Backend Events ==
    pub fn record_backend_hit(&mut self) {
        self.backend_hits += 1;
    }

    pub fn record_backend_error(&mut self) {
        self.backend_errors += 1;
    }
}
