//! Error types for the caching engine
//!
//! Provides unified error handling using thiserror.
//!
//! A cache miss is deliberately NOT represented here: lookups return
//! `Option` because an absent or expired key is a normal outcome, not a
//! failure.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the caching engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Negative TTL supplied on set; the entry is not stored.
    #[error("Invalid TTL: {0} seconds (must be non-negative)")]
    InvalidTtl(i64),

    /// Key or value failed size validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Cache is at capacity and no entry could be evicted.
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// Snapshot file could not be written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    /// Snapshot could not be serialized.
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

// == Backend Error Enum ==
/// Failures reported by a distributed cache backend.
///
/// All variants are recoverable: the store falls back to local-only
/// operation (degraded mode) rather than propagating them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Optimistic-concurrency conflict: the stored version did not match
    /// the expected one. Carries the version actually stored so the caller
    /// can retry once with fresh state.
    #[error("Version conflict: backend holds version {actual_version}")]
    Conflict { actual_version: u64 },

    /// Backend unreachable or otherwise failing.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Backend call exceeded its time bound.
    #[error("Backend call timed out")]
    Timeout,
}

// == Result Type Alias ==
/// Convenience Result type for the caching engine.
pub type Result<T> = std::result::Result<T, CacheError>;
