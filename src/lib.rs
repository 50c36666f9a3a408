//! gencache - An in-process caching engine for generated text
//!
//! A hybrid TTL+LRU store with deterministic key derivation, durable
//! snapshots, hierarchical topic namespacing and usage statistics. It sits
//! in front of expensive, rate-limited generation calls; the caller derives
//! a key, looks it up, and on a miss materializes the value itself and
//! stores it back.

pub mod backend;
pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod persist;
pub mod tasks;

pub use backend::{CacheBackend, LocalBackend};
pub use cache::keys::derive_key;
pub use cache::{CacheEntry, CacheStats, CacheStore, ContentType, NamespaceIndex, Ttl};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::{CacheEngine, SharedEngine};
pub use error::{BackendError, CacheError, Result};
pub use persist::{PersistenceManager, Snapshot};
pub use tasks::spawn_maintenance_task;
