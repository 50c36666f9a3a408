//! Cache Engine Module
//!
//! Composes the store and the namespace index into one explicitly owned
//! unit with a caller-controlled lifecycle: construct with capacity and
//! snapshot path, share behind a lock, flush on teardown.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::backend::CacheBackend;
use crate::cache::{CacheStore, NamespaceIndex};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::Result;
use crate::persist::{PersistenceManager, Snapshot};

// == Shared Handle ==
/// Shared, lock-guarded engine handle.
///
/// Lookups mutate recency, so every store operation takes the write path;
/// snapshot capture may run under a read lock.
pub type SharedEngine = Arc<RwLock<CacheEngine>>;

// == Cache Engine ==
/// The store plus its namespace index.
#[derive(Debug)]
pub struct CacheEngine {
    pub store: CacheStore,
    pub index: NamespaceIndex,
}

impl CacheEngine {
    // == Constructors ==
    /// Creates an empty engine from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            store: CacheStore::new(config.max_entries, config.short_ttl, config.long_ttl),
            index: NamespaceIndex::new(config.popularity_threshold, config.max_ttl),
        }
    }

    /// Creates an empty engine reading time from the supplied clock.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: CacheStore::with_clock(
                config.max_entries,
                config.short_ttl,
                config.long_ttl,
                clock,
            ),
            index: NamespaceIndex::new(config.popularity_threshold, config.max_ttl),
        }
    }

    /// Creates an engine restored from the persisted snapshot.
    ///
    /// A missing or corrupt snapshot file yields an empty engine; entries
    /// expired since the snapshot was taken are dropped.
    pub fn load(config: &Config, persistence: &PersistenceManager) -> Self {
        let mut engine = Self::new(config);
        persistence
            .load()
            .restore_into(&mut engine.store, &mut engine.index);
        info!(entries = engine.store.len(), "Cache engine restored");
        engine
    }

    /// Attaches a distributed backend to the store.
    pub fn with_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.store = self.store.with_backend(backend);
        self
    }

    /// Wraps the engine in its shared handle.
    pub fn into_shared(self) -> SharedEngine {
        Arc::new(RwLock::new(self))
    }

    // == Snapshot ==
    /// Captures a consistent snapshot of store and index.
    ///
    /// Cheap relative to disk I/O; callers take it under the lock and write
    /// the file after releasing it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.store, &self.index)
    }

    // == Flush ==
    /// Writes the current state to disk. Used on teardown.
    pub fn flush(&self, persistence: &PersistenceManager) -> Result<()> {
        persistence.save(&self.snapshot())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::Ttl;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            cache_file: dir
                .path()
                .join("cache.json")
                .to_string_lossy()
                .into_owned(),
            ..Config::default()
        }
    }

    #[test]
    fn test_new_engine_is_empty() {
        let engine = CacheEngine::new(&Config::default());
        assert!(engine.store.is_empty());
        assert!(engine.index.topics().is_empty());
    }

    #[test]
    fn test_flush_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let pm = PersistenceManager::new(&config.cache_file);

        let mut engine = CacheEngine::new(&config);
        engine
            .store
            .set("key".to_string(), "value".to_string(), Ttl::Long)
            .unwrap();
        engine.flush(&pm).unwrap();

        let mut restored = CacheEngine::load(&config, &pm);
        assert_eq!(restored.store.len(), 1);
        assert_eq!(restored.store.get("key"), Some("value".to_string()));
    }

    #[test]
    fn test_load_without_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let pm = PersistenceManager::new(&config.cache_file);

        let engine = CacheEngine::load(&config, &pm);
        assert!(engine.store.is_empty());
    }
}
