//! Cache Module
//!
//! The caching core: TTL expiration, LRU eviction, deterministic key
//! derivation, hierarchical namespacing and usage statistics.

mod entry;
pub mod keys;
mod lru;
pub mod namespace;
mod stats;
pub mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use namespace::{ContentType, NamespaceIndex};
pub use stats::{CacheStats, TypeStats};
pub use store::{CacheStore, Ttl};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
