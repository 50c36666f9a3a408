//! Configuration Module
//!
//! Handles loading and managing engine configuration from environment
//! variables.

use std::env;

/// Engine configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the store can hold
    pub max_entries: usize,
    /// Short-lived default TTL in seconds (volatile content)
    pub short_ttl: u64,
    /// Long-lived default TTL in seconds (stable content)
    pub long_ttl: u64,
    /// Cap for adaptively extended TTLs, in seconds
    pub max_ttl: u64,
    /// Saves per topic before adaptive TTL starts growing
    pub popularity_threshold: u64,
    /// Path of the persistence snapshot file
    pub cache_file: String,
    /// Background maintenance interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `SHORT_TTL` - Short default TTL in seconds (default: 3600)
    /// - `LONG_TTL` - Long default TTL in seconds (default: 86400)
    /// - `MAX_TTL` - Adaptive TTL cap in seconds (default: 604800)
    /// - `POPULARITY_THRESHOLD` - Adaptive TTL threshold (default: 5)
    /// - `CACHE_FILE` - Snapshot file path (default: "gencache.json")
    /// - `CLEANUP_INTERVAL` - Maintenance frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            short_ttl: env_or("SHORT_TTL", defaults.short_ttl),
            long_ttl: env_or("LONG_TTL", defaults.long_ttl),
            max_ttl: env_or("MAX_TTL", defaults.max_ttl),
            popularity_threshold: env_or("POPULARITY_THRESHOLD", defaults.popularity_threshold),
            cache_file: env::var("CACHE_FILE").unwrap_or(defaults.cache_file),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            short_ttl: 3600,
            long_ttl: 86400,
            max_ttl: 604800,
            popularity_threshold: 5,
            cache_file: "gencache.json".to_string(),
            cleanup_interval: 60,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
