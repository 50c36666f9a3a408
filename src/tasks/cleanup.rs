//! Maintenance Task
//!
//! Background task that periodically removes expired cache entries,
//! re-arms a degraded backend, and snapshots the engine to disk.
//!
//! The write lock is held only for the sweep and the snapshot capture; the
//! file write itself happens after the lock is released so disk I/O never
//! blocks foreground operations.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::SharedEngine;
use crate::persist::PersistenceManager;

/// Spawns the periodic maintenance task.
///
/// Each tick: acquire the write lock, sweep expired entries, clear the
/// store's degraded flag, capture a snapshot; release the lock; write the
/// snapshot to disk.
///
/// # Arguments
/// * `engine` - Shared engine handle
/// * `persistence` - Snapshot file manager
/// * `interval_secs` - Seconds between maintenance runs
///
/// # Returns
/// A JoinHandle that can be aborted during graceful shutdown. The caller
/// should flush the engine once more after aborting.
pub fn spawn_maintenance_task(
    engine: SharedEngine,
    persistence: PersistenceManager,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "Starting cache maintenance task");

        loop {
            tokio::time::sleep(interval).await;

            // Sweep and snapshot under the lock, write outside it
            let (removed, snapshot) = {
                let mut guard = engine.write().await;
                let removed = guard.store.cleanup_expired();
                guard.store.clear_degraded();
                (removed, guard.snapshot())
            };

            if removed > 0 {
                info!(removed, "Maintenance sweep removed expired entries");
            } else {
                debug!("Maintenance sweep found no expired entries");
            }

            if let Err(err) = persistence.save(&snapshot) {
                warn!(error = %err, "Periodic snapshot failed; cache stays in memory");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::Ttl;
    use crate::config::Config;
    use crate::engine::CacheEngine;
    use tempfile::TempDir;

    fn shared_engine(dir: &TempDir) -> (SharedEngine, PersistenceManager) {
        let config = Config {
            cache_file: dir
                .path()
                .join("cache.json")
                .to_string_lossy()
                .into_owned(),
            ..Config::default()
        };
        let pm = PersistenceManager::new(&config.cache_file);
        (CacheEngine::new(&config).into_shared(), pm)
    }

    #[tokio::test]
    async fn test_maintenance_removes_expired_entries() {
        let dir = TempDir::new().unwrap();
        let (engine, pm) = shared_engine(&dir);

        {
            let mut guard = engine.write().await;
            guard
                .store
                .set("expire_soon".to_string(), "v".to_string(), Ttl::Secs(1))
                .unwrap();
        }

        let handle = spawn_maintenance_task(engine.clone(), pm, 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        {
            let guard = engine.read().await;
            assert_eq!(guard.store.len(), 0, "Expired entry should be swept");
        }
        handle.abort();
    }

    #[tokio::test]
    async fn test_maintenance_preserves_valid_entries_and_snapshots() {
        let dir = TempDir::new().unwrap();
        let (engine, pm) = shared_engine(&dir);

        {
            let mut guard = engine.write().await;
            guard
                .store
                .set("long_lived".to_string(), "v".to_string(), Ttl::Secs(3600))
                .unwrap();
        }

        let handle = spawn_maintenance_task(engine.clone(), pm.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        {
            let mut guard = engine.write().await;
            assert_eq!(guard.store.get("long_lived"), Some("v".to_string()));
        }

        // The periodic snapshot landed on disk
        let snapshot = pm.load();
        assert_eq!(snapshot.entries.len(), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_maintenance_task_can_be_aborted() {
        let dir = TempDir::new().unwrap();
        let (engine, pm) = shared_engine(&dir);

        let handle = spawn_maintenance_task(engine, pm, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
