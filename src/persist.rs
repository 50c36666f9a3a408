//! Persistence Module
//!
//! Durable snapshotting of the whole engine to a single JSON file.
//!
//! Saves are atomic with respect to crashes and concurrent readers: the
//! snapshot is written to a sibling temporary file and renamed into place,
//! so a reader never observes a half-written file. A missing file on load
//! is an empty store; a malformed file is logged and likewise treated as
//! empty rather than aborting startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::namespace::{NamespaceIndex, NamespaceSnapshot};
use crate::cache::{CacheEntry, CacheStore};
use crate::error::Result;

/// Bumped when the snapshot layout changes incompatibly.
const SNAPSHOT_FORMAT_VERSION: u32 = 1;

// == Snapshot ==
/// Complete point-in-time serialization of store and namespace state.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub entries: Vec<SnapshotEntry>,
    pub namespace: NamespaceSnapshot,
}

/// One persisted entry: the flat key plus its full metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub entry: CacheEntry,
}

impl Snapshot {
    /// Captures the current state of store and index.
    ///
    /// Entries already expired at capture time are pruned rather than
    /// written out.
    pub fn capture(store: &CacheStore, index: &NamespaceIndex) -> Self {
        let entries = store
            .export_entries()
            .into_iter()
            .map(|(key, entry)| SnapshotEntry { key, entry })
            .collect();
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            entries,
            namespace: index.snapshot(),
        }
    }

    /// An empty snapshot, used when no file exists or it cannot be read.
    pub fn empty() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            entries: Vec::new(),
            namespace: NamespaceSnapshot::default(),
        }
    }

    /// Applies the snapshot to a store and index. Expired entries are
    /// dropped during import, never resurrected.
    pub fn restore_into(self, store: &mut CacheStore, index: &mut NamespaceIndex) {
        let entries = self
            .entries
            .into_iter()
            .map(|e| (e.key, e.entry))
            .collect();
        store.import_entries(entries);
        index.restore(self.namespace);
    }
}

// == Persistence Manager ==
/// Owns the snapshot file path and performs atomic save / tolerant load.
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    path: PathBuf,
}

impl PersistenceManager {
    // == Constructor ==
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Load ==
    /// Reads the snapshot from disk.
    ///
    /// Corruption and absence are both recoverable: the engine starts from
    /// an empty snapshot instead of failing.
    pub fn load(&self) -> Snapshot {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No snapshot file, starting empty");
                return Snapshot::empty();
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to read snapshot, starting empty");
                return Snapshot::empty();
            }
        };

        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => {
                info!(
                    path = %self.path.display(),
                    entries = snapshot.entries.len(),
                    "Loaded cache snapshot"
                );
                snapshot
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Malformed snapshot, starting empty");
                Snapshot::empty()
            }
        }
    }

    // == Save ==
    /// Writes the snapshot atomically: temporary file, then rename.
    ///
    /// On failure the in-memory state is unaffected; the error is returned
    /// to the caller.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, &bytes)?;
        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            // Don't leave the temporary file behind on a failed rename
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }

        info!(
            path = %self.path.display(),
            entries = snapshot.entries.len(),
            bytes = bytes.len(),
            "Saved cache snapshot"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut file_name = self.path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }
}
