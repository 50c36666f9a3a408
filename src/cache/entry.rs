//! Cache Entry Module
//!
//! Defines the unit of storage: value plus the metadata the engine needs
//! for TTL expiry, LRU accounting, capacity estimation and optimistic
//! concurrency against a distributed backend.

use serde::{Deserialize, Serialize};

/// Fixed per-entry bookkeeping overhead used for capacity estimation.
const ENTRY_OVERHEAD_BYTES: usize = 64;

// == Cache Entry ==
/// A single cache entry with value and metadata.
///
/// Timestamps are Unix milliseconds supplied by the owning store's clock;
/// the entry itself never reads the system time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = never expires
    pub expires_at: Option<u64>,
    /// Timestamp of the last successful lookup (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Number of successful lookups for this entry
    pub access_count: u64,
    /// Incremented on every set of the same key; starts at 1
    pub version: u64,
    /// Approximate memory footprint in bytes (key + value + overhead)
    pub size_estimate: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `key` - The key the entry will be stored under (for size estimation)
    /// * `value` - The value to store
    /// * `ttl_ms` - Optional TTL in milliseconds; None = never expires
    /// * `version` - Entry version (1 for new keys, previous + 1 on replace)
    /// * `now_ms` - Current time in Unix milliseconds
    pub fn new(key: &str, value: String, ttl_ms: Option<u64>, version: u64, now_ms: u64) -> Self {
        let size_estimate = key.len() + value.len() + ENTRY_OVERHEAD_BYTES;
        Self {
            value,
            created_at: now_ms,
            expires_at: ttl_ms.map(|ttl| now_ms + ttl),
            last_accessed_at: now_ms,
            access_count: 0,
            version,
            size_estimate,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at the given instant.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to its expiration time.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Touch ==
    /// Records a successful lookup: refreshes recency, bumps the counter.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_accessed_at = now_ms;
        self.access_count += 1;
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds at the given instant, or None
    /// if the entry never expires. Expired entries report `Some(0)`.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(now_ms))
    }
}
