//! Backend Port Module
//!
//! Abstract contract for a distributed cache backend the store may
//! delegate to. Concrete network backends are out of scope; implementations
//! are expected to bound their own call time and surface failures through
//! `BackendError` so the store can degrade to local-only operation.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::cache::CacheEntry;
use crate::error::BackendError;

// == Backend Trait ==
/// Put/get/delete contract for a distributed cache backend.
pub trait CacheBackend: Send + Sync {
    /// Stores an entry, optionally guarded by optimistic concurrency.
    ///
    /// With `expected_version` set, the put only succeeds when the backend
    /// currently holds that version (absent entries count as version 0);
    /// otherwise it fails with `Conflict` carrying the actual version so
    /// the caller can retry once with refreshed state.
    fn put(
        &self,
        key: &str,
        entry: &CacheEntry,
        expected_version: Option<u64>,
    ) -> Result<(), BackendError>;

    /// Fetches an entry. Absence is `Ok(None)`, not an error.
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, BackendError>;

    /// Deletes an entry. Deleting an absent key is a no-op.
    fn delete(&self, key: &str) -> Result<(), BackendError>;
}

// == Local Backend ==
/// In-memory reference implementation of the backend contract.
///
/// Suitable for single-process deployments and tests; it exercises the
/// full optimistic-concurrency protocol without any networking.
#[derive(Debug, Default)]
pub struct LocalBackend {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("backend lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for LocalBackend {
    fn put(
        &self,
        key: &str,
        entry: &CacheEntry,
        expected_version: Option<u64>,
    ) -> Result<(), BackendError> {
        let mut entries = self.entries.lock().expect("backend lock poisoned");

        if let Some(expected) = expected_version {
            let actual = entries.get(key).map_or(0, |e| e.version);
            if actual != expected {
                return Err(BackendError::Conflict {
                    actual_version: actual,
                });
            }
        }

        entries.insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>, BackendError> {
        let entries = self.entries.lock().expect("backend lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), BackendError> {
        let mut entries = self.entries.lock().expect("backend lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: &str, version: u64) -> CacheEntry {
        CacheEntry::new("k", value.to_string(), None, version, 1_000)
    }

    #[test]
    fn test_put_get_delete_round_trip() {
        let backend = LocalBackend::new();

        backend.put("k", &entry("v", 1), None).unwrap();
        let fetched = backend.get("k").unwrap().unwrap();
        assert_eq!(fetched.value, "v");

        backend.delete("k").unwrap();
        assert!(backend.get("k").unwrap().is_none());
    }

    #[test]
    fn test_get_absent_is_none() {
        let backend = LocalBackend::new();
        assert!(backend.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let backend = LocalBackend::new();
        assert!(backend.delete("missing").is_ok());
    }

    #[test]
    fn test_unconditional_put_overwrites() {
        let backend = LocalBackend::new();

        backend.put("k", &entry("v1", 1), None).unwrap();
        backend.put("k", &entry("v2", 7), None).unwrap();
        assert_eq!(backend.get("k").unwrap().unwrap().value, "v2");
    }

    #[test]
    fn test_guarded_put_matches_version() {
        let backend = LocalBackend::new();

        backend.put("k", &entry("v1", 1), Some(0)).unwrap();
        backend.put("k", &entry("v2", 2), Some(1)).unwrap();
        assert_eq!(backend.get("k").unwrap().unwrap().version, 2);
    }

    #[test]
    fn test_guarded_put_conflicts_on_stale_version() {
        let backend = LocalBackend::new();

        backend.put("k", &entry("v1", 3), None).unwrap();
        let result = backend.put("k", &entry("v2", 2), Some(1));
        assert_eq!(result, Err(BackendError::Conflict { actual_version: 3 }));
        // The stale put must not have replaced the entry
        assert_eq!(backend.get("k").unwrap().unwrap().value, "v1");
    }

    #[test]
    fn test_guarded_put_on_absent_key_treats_version_as_zero() {
        let backend = LocalBackend::new();

        let result = backend.put("k", &entry("v", 1), Some(4));
        assert_eq!(result, Err(BackendError::Conflict { actual_version: 0 }));
        assert!(backend.put("k", &entry("v", 1), Some(0)).is_ok());
    }
}
