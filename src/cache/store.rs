//! Cache Store Module
//!
//! The TTL+LRU engine: a bounded map of key to entry with lazy expiry,
//! strict LRU eviction, lifetime statistics, and optional write-through /
//! read-through delegation to a distributed backend.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::CacheBackend;
use crate::cache::namespace::ContentType;
use crate::cache::{CacheEntry, CacheStats, LruTracker, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::clock::{Clock, SystemClock};
use crate::error::{BackendError, CacheError, Result};

// == TTL Selection ==
/// Time-to-live requested on a `set`.
///
/// Callers pick one of the two named store defaults based on how volatile
/// the content is, give an explicit duration, or opt out of expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The store's short-lived default (volatile content, e.g. 1 hour).
    Short,
    /// The store's long-lived default (stable content, e.g. 24 hours).
    Long,
    /// Explicit duration in seconds. Negative values are rejected.
    Secs(i64),
    /// The entry never expires.
    Never,
}

// == Cache Store ==
/// Bounded key-value store with TTL expiration and LRU eviction.
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Recency ordering for eviction
    lru: LruTracker,
    /// Lifetime usage counters
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Named TTL defaults in milliseconds
    short_ttl_ms: u64,
    long_ttl_ms: u64,
    /// Sum of entry size estimates, for capacity reporting
    estimated_bytes: usize,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Optional distributed backend
    backend: Option<Arc<dyn CacheBackend>>,
    /// Set when a backend call failed; the store runs local-only until the
    /// next maintenance sweep re-arms it
    degraded: bool,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .field("degraded", &self.degraded)
            .finish()
    }
}

impl CacheStore {
    // == Constructors ==
    /// Creates a store with the given capacity and named TTL defaults.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the store can hold
    /// * `short_ttl_secs` - Short-lived default TTL in seconds
    /// * `long_ttl_secs` - Long-lived default TTL in seconds
    pub fn new(max_entries: usize, short_ttl_secs: u64, long_ttl_secs: u64) -> Self {
        Self::with_clock(max_entries, short_ttl_secs, long_ttl_secs, Arc::new(SystemClock))
    }

    /// Creates a store reading time from the supplied clock.
    pub fn with_clock(
        max_entries: usize,
        short_ttl_secs: u64,
        long_ttl_secs: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
            short_ttl_ms: short_ttl_secs * 1000,
            long_ttl_ms: long_ttl_secs * 1000,
            estimated_bytes: 0,
            clock,
            backend: None,
            degraded: false,
        }
    }

    /// Attaches a distributed backend the store will delegate to.
    pub fn with_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    // == TTL Resolution ==
    /// Resolves a TTL specification to milliseconds.
    ///
    /// Negative explicit durations are a configuration error and rejected.
    pub fn resolve_ttl_ms(&self, ttl: Ttl) -> Result<Option<u64>> {
        match ttl {
            Ttl::Short => Ok(Some(self.short_ttl_ms)),
            Ttl::Long => Ok(Some(self.long_ttl_ms)),
            Ttl::Secs(secs) if secs < 0 => Err(CacheError::InvalidTtl(secs)),
            Ttl::Secs(secs) => Ok(Some((secs as u64).saturating_mul(1000))),
            Ttl::Never => Ok(None),
        }
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// Replacing an existing key bumps its version and resets its expiry.
    /// When the store is at capacity, exactly one least-recently-used entry
    /// is evicted per inserted key.
    pub fn set(&mut self, key: String, value: String, ttl: Ttl) -> Result<()> {
        let ttl_ms = self.resolve_ttl_ms(ttl)?;
        self.set_raw(key, value, ttl_ms)
    }

    /// Stores a key-value pair with an already-resolved TTL in milliseconds.
    ///
    /// Used by the namespace layer after it has applied adaptive TTL.
    pub(crate) fn set_raw(&mut self, key: String, value: String, ttl_ms: Option<u64>) -> Result<()> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let previous_version = self.entries.get(&key).map(|e| e.version);
        if previous_version.is_none() {
            self.make_room()?;
        }

        let now = self.clock.now_ms();
        let version = previous_version.map_or(1, |v| v + 1);
        let entry = CacheEntry::new(&key, value, ttl_ms, version, now);

        if let Some(old) = self.entries.insert(key.clone(), entry.clone()) {
            self.estimated_bytes -= old.size_estimate;
        }
        self.estimated_bytes += entry.size_estimate;
        self.lru.touch(&key);
        self.stats.record_set();

        self.push_to_backend(&key, entry, previous_version);
        Ok(())
    }

    /// Evicts the least-recently-used entry if the store is at capacity.
    ///
    /// One eviction is always enough for a single insert, so this never
    /// removes more than one entry.
    fn make_room(&mut self) -> Result<()> {
        if self.entries.len() < self.max_entries {
            return Ok(());
        }
        match self.lru.pop_lru() {
            Some(evicted_key) => {
                if let Some(old) = self.entries.remove(&evicted_key) {
                    self.estimated_bytes -= old.size_estimate;
                }
                self.stats.record_eviction();
                debug!(key = %evicted_key, "Evicted least recently used entry");
                Ok(())
            }
            None => Err(CacheError::CacheFull(
                "Cache is full and eviction failed".to_string(),
            )),
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Absent and expired keys are misses, returned as `None`. Expired
    /// entries are removed on discovery and cannot be resurrected.
    pub fn get(&mut self, key: &str) -> Option<String> {
        self.get_as(key, None)
    }

    /// Retrieves a value, attributing the hit or miss to a content type.
    pub fn get_as(&mut self, key: &str, kind: Option<ContentType>) -> Option<String> {
        let now = self.clock.now_ms();

        // First borrow only the entry; bookkeeping mutations follow after
        // the borrow ends.
        let lookup = match self.entries.get_mut(key) {
            Some(entry) if entry.is_expired(now) => Some(None),
            Some(entry) => {
                entry.touch(now);
                Some(Some(entry.value.clone()))
            }
            None => None,
        };

        match lookup {
            Some(Some(value)) => {
                self.lru.touch(key);
                self.stats.record_hit(kind);
                return Some(value);
            }
            Some(None) => {
                self.drop_entry(key);
                self.stats.record_expiration();
                debug!(key = %key, "Entry expired on lookup");
            }
            None => {}
        }

        // Local miss: consult the backend before giving up.
        if let Some(value) = self.fetch_from_backend(key, now) {
            self.stats.record_hit(kind);
            self.stats.record_backend_hit();
            return Some(value);
        }

        self.stats.record_miss(kind);
        None
    }

    // == Remove ==
    /// Removes an entry by key. Idempotent: removing an absent key is a
    /// no-op and returns false.
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = match self.entries.remove(key) {
            Some(old) => {
                self.estimated_bytes -= old.size_estimate;
                self.lru.forget(key);
                self.stats.record_remove();
                true
            }
            None => false,
        };

        if let Some(backend) = self.available_backend() {
            if let Err(err) = backend.delete(key) {
                self.note_backend_failure("delete", &err);
            }
        }
        removed
    }

    // == Clear ==
    /// Drops all entries and the recency ordering.
    ///
    /// Statistics counters describe lifetime usage and are left intact.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.estimated_bytes = 0;
    }

    // == Stats ==
    /// Returns a snapshot of the statistics plus current occupancy.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.estimated_bytes = self.estimated_bytes;
        stats.degraded = self.degraded;
        stats
    }

    // == Cleanup Expired ==
    /// Removes every expired entry. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.drop_entry(key);
            self.stats.record_expiration();
        }
        expired_keys.len()
    }

    // == Degraded Mode ==
    /// Whether the store is currently running without its backend.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Re-arms the backend after degradation; the next delegating operation
    /// will probe it again. Called by the maintenance sweep.
    pub fn clear_degraded(&mut self) {
        if self.degraded {
            debug!("Re-arming distributed backend after degraded period");
            self.degraded = false;
        }
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Snapshot Support ==
    /// Exports all non-expired entries for persistence.
    pub(crate) fn export_entries(&self) -> Vec<(String, CacheEntry)> {
        let now = self.clock.now_ms();
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Restores entries from a persisted snapshot.
    ///
    /// Entries already expired at load time are dropped, never resurrected.
    /// The recency ordering is rebuilt from `last_accessed_at` (creation
    /// time breaks ties), and if the snapshot exceeds the configured
    /// capacity only the most recently accessed entries are kept.
    pub(crate) fn import_entries(&mut self, mut entries: Vec<(String, CacheEntry)>) {
        let now = self.clock.now_ms();
        entries.retain(|(_, entry)| !entry.is_expired(now));
        entries.sort_by_key(|(_, entry)| (entry.last_accessed_at, entry.created_at));

        let skip = entries.len().saturating_sub(self.max_entries);
        for (key, entry) in entries.into_iter().skip(skip) {
            self.estimated_bytes += entry.size_estimate;
            self.entries.insert(key.clone(), entry);
            self.lru.touch(&key);
        }
    }

    // == Internal Helpers ==
    /// Removes an entry and its bookkeeping without touching counters.
    fn drop_entry(&mut self, key: &str) {
        if let Some(old) = self.entries.remove(key) {
            self.estimated_bytes -= old.size_estimate;
        }
        self.lru.forget(key);
    }

    fn available_backend(&self) -> Option<Arc<dyn CacheBackend>> {
        if self.degraded {
            None
        } else {
            self.backend.clone()
        }
    }

    fn note_backend_failure(&mut self, operation: &str, err: &BackendError) {
        self.stats.record_backend_error();
        match err {
            BackendError::Unavailable(_) | BackendError::Timeout => {
                warn!(%operation, error = %err, "Backend failed, degrading to local-only");
                self.degraded = true;
            }
            BackendError::Conflict { .. } => {
                warn!(%operation, error = %err, "Backend version conflict not resolved");
            }
        }
    }

    /// Write-through with optimistic concurrency.
    ///
    /// A version conflict triggers exactly one retry against the version
    /// the backend reported; unavailability degrades to local-only.
    fn push_to_backend(&mut self, key: &str, mut entry: CacheEntry, previous_version: Option<u64>) {
        let Some(backend) = self.available_backend() else {
            return;
        };

        // Absent keys count as version 0 in the backend's guard
        let expected = Some(previous_version.unwrap_or(0));
        match backend.put(key, &entry, expected) {
            Ok(()) => {}
            Err(BackendError::Conflict { actual_version }) => {
                entry.version = actual_version + 1;
                if let Some(local) = self.entries.get_mut(key) {
                    local.version = entry.version;
                }
                if let Err(err) = backend.put(key, &entry, Some(actual_version)) {
                    self.note_backend_failure("put", &err);
                }
            }
            Err(err) => self.note_backend_failure("put", &err),
        }
    }

    /// Read-through on local miss. A backend hit is adopted into the local
    /// store (subject to the capacity bound) so later lookups stay local.
    fn fetch_from_backend(&mut self, key: &str, now: u64) -> Option<String> {
        let backend = self.available_backend()?;

        match backend.get(key) {
            Ok(Some(mut entry)) => {
                if entry.is_expired(now) {
                    if let Err(err) = backend.delete(key) {
                        self.note_backend_failure("delete", &err);
                    }
                    return None;
                }
                entry.touch(now);
                let value = entry.value.clone();
                if self.make_room().is_ok() {
                    self.estimated_bytes += entry.size_estimate;
                    self.entries.insert(key.to_string(), entry);
                    self.lru.touch(key);
                }
                Some(value)
            }
            Ok(None) => None,
            Err(err) => {
                self.note_backend_failure("get", &err);
                None
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store_with_clock(max_entries: usize) -> (CacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = CacheStore::with_clock(max_entries, 3600, 86400, clock.clone());
        (store, clock)
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100, 3600, 86400);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_and_get_round_trip() {
        let (mut store, _) = store_with_clock(100);

        store.set("key1".to_string(), "value1".to_string(), Ttl::Short).unwrap();
        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_absent_is_miss_not_error() {
        let (mut store, _) = store_with_clock(100);
        assert_eq!(store.get("nonexistent"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_negative_ttl_rejected_and_not_stored() {
        let (mut store, _) = store_with_clock(100);

        let result = store.set("key".to_string(), "v".to_string(), Ttl::Secs(-5));
        assert!(matches!(result, Err(CacheError::InvalidTtl(-5))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let (mut store, _) = store_with_clock(100);

        store.set("key".to_string(), "v".to_string(), Ttl::Secs(0)).unwrap();
        assert_eq!(store.get("key"), None);
    }

    #[test]
    fn test_expiry_with_simulated_time() {
        let (mut store, clock) = store_with_clock(100);

        store.set("key".to_string(), "v".to_string(), Ttl::Secs(10)).unwrap();
        assert_eq!(store.get("key"), Some("v".to_string()));

        clock.advance_secs(10);
        assert_eq!(store.get("key"), None);
        assert_eq!(store.len(), 0, "Expired entry must be removed");

        // Not resurrectable no matter how far time advances
        clock.advance_secs(1_000);
        assert_eq!(store.get("key"), None);

        let stats = store.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_never_expires() {
        let (mut store, clock) = store_with_clock(100);

        store.set("key".to_string(), "v".to_string(), Ttl::Never).unwrap();
        clock.advance_secs(10_000_000);
        assert_eq!(store.get("key"), Some("v".to_string()));
    }

    #[test]
    fn test_overwrite_bumps_version_and_resets_expiry() {
        let (mut store, clock) = store_with_clock(100);

        store.set("key".to_string(), "v1".to_string(), Ttl::Secs(10)).unwrap();
        clock.advance_secs(8);
        store.set("key".to_string(), "v2".to_string(), Ttl::Secs(10)).unwrap();
        clock.advance_secs(8);

        // Expiry was reset by the second set
        assert_eq!(store.get("key"), Some("v2".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.export_entries()[0].1.version, 2);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let (mut store, _) = store_with_clock(2);

        store.set("a".to_string(), "1".to_string(), Ttl::Never).unwrap();
        store.set("b".to_string(), "2".to_string(), Ttl::Never).unwrap();
        store.set("c".to_string(), "3".to_string(), Ttl::Never).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), Some("2".to_string()));
        assert_eq!(store.get("c"), Some("3".to_string()));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_worked_eviction_scenario() {
        // Capacity 2: insert A, B, C -> {B, C}; get(B); insert D -> {B, D}
        let (mut store, _) = store_with_clock(2);

        store.set("A".to_string(), "a".to_string(), Ttl::Never).unwrap();
        store.set("B".to_string(), "b".to_string(), Ttl::Never).unwrap();
        store.set("C".to_string(), "c".to_string(), Ttl::Never).unwrap();

        assert_eq!(store.get("B"), Some("b".to_string()));

        store.set("D".to_string(), "d".to_string(), Ttl::Never).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("B"), Some("b".to_string()));
        assert_eq!(store.get("D"), Some("d".to_string()));
        assert_eq!(store.get("A"), None);
        assert_eq!(store.get("C"), None);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let (mut store, _) = store_with_clock(2);

        store.set("a".to_string(), "1".to_string(), Ttl::Never).unwrap();
        store.set("b".to_string(), "2".to_string(), Ttl::Never).unwrap();
        store.set("a".to_string(), "3".to_string(), Ttl::Never).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("b"), Some("2".to_string()));
    }

    #[test]
    fn test_zero_capacity_store_rejects_inserts() {
        let (mut store, _) = store_with_clock(0);
        let result = store.set("a".to_string(), "1".to_string(), Ttl::Never);
        assert!(matches!(result, Err(CacheError::CacheFull(_))));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut store, _) = store_with_clock(100);

        store.set("key".to_string(), "v".to_string(), Ttl::Never).unwrap();
        assert!(store.remove("key"));
        assert!(!store.remove("key"));
        assert!(!store.remove("never_existed"));
        assert!(store.is_empty());
        assert_eq!(store.stats().removes, 1);
    }

    #[test]
    fn test_clear_keeps_lifetime_stats() {
        let (mut store, _) = store_with_clock(100);

        store.set("key".to_string(), "v".to_string(), Ttl::Never).unwrap();
        store.get("key");
        store.get("missing");
        store.clear();

        assert!(store.is_empty());
        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.estimated_bytes, 0);
    }

    #[test]
    fn test_cleanup_expired() {
        let (mut store, clock) = store_with_clock(100);

        store.set("short".to_string(), "v".to_string(), Ttl::Secs(5)).unwrap();
        store.set("long".to_string(), "v".to_string(), Ttl::Secs(500)).unwrap();

        clock.advance_secs(10);
        let removed = store.cleanup_expired();

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("long"), Some("v".to_string()));
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_key_too_long_rejected() {
        let (mut store, _) = store_with_clock(100);
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        let result = store.set(long_key, "v".to_string(), Ttl::Never);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_value_too_large_rejected() {
        let (mut store, _) = store_with_clock(100);
        let large_value = "x".repeat(MAX_VALUE_SIZE + 1);

        let result = store.set("key".to_string(), large_value, Ttl::Never);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_estimated_bytes_tracks_contents() {
        let (mut store, _) = store_with_clock(100);

        store.set("key".to_string(), "some value".to_string(), Ttl::Never).unwrap();
        let after_set = store.stats().estimated_bytes;
        assert!(after_set > 0);

        store.remove("key");
        assert_eq!(store.stats().estimated_bytes, 0);
    }

    #[test]
    fn test_import_drops_expired_and_respects_capacity() {
        let (mut store, clock) = store_with_clock(2);
        let now = clock.now_ms();

        let entries = vec![
            ("stale".to_string(), CacheEntry::new("stale", "v".to_string(), Some(1), 1, now - 10)),
            ("old".to_string(), CacheEntry::new("old", "v".to_string(), None, 1, now - 3)),
            ("mid".to_string(), CacheEntry::new("mid", "v".to_string(), None, 1, now - 2)),
            ("new".to_string(), CacheEntry::new("new", "v".to_string(), None, 1, now - 1)),
        ];
        store.import_entries(entries);

        // Expired entry dropped; capacity keeps the two most recent
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("mid"), Some("v".to_string()));
        assert_eq!(store.get("new"), Some("v".to_string()));
        assert_eq!(store.get("stale"), None);
        assert_eq!(store.get("old"), None);
    }

    #[test]
    fn test_stats_hit_rate_sequence() {
        let (mut store, _) = store_with_clock(100);

        store.set("a".to_string(), "1".to_string(), Ttl::Never).unwrap();
        store.get("a");
        store.get("a");
        store.get("a");
        store.get("missing");

        let stats = store.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.75);
    }
}
