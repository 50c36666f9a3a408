//! Namespace Index Module
//!
//! Hierarchical organization layered over the flat key space: topic ->
//! content type -> cache key. The index never duplicates stored values; it
//! only remembers which key each (topic, content type) pair maps to and
//! delegates storage to the store. Per-topic popularity counters feed an
//! adaptive TTL that keeps frequently requested topics cached longer.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::keys::derive_key;
use crate::cache::store::{CacheStore, Ttl};
use crate::error::Result;

/// Key prefix for all namespaced text entries.
const TEXT_KEY_PREFIX: &str = "text";

// == Content Type ==
/// Kind of generated text stored under a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Introductory overview of a topic
    TopicOverview,
    /// Generated quiz questions for a topic
    Quiz,
    /// Condensed summary of a topic
    Summary,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::TopicOverview => "topic_overview",
            ContentType::Quiz => "quiz",
            ContentType::Summary => "summary",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Namespace Snapshot ==
/// Serializable state of the index for the persistence snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceSnapshot {
    pub mappings: HashMap<String, HashMap<ContentType, String>>,
    pub popularity: HashMap<String, u64>,
}

// == Namespace Index ==
/// Two-level index (topic, content type) over the flat cache key space.
#[derive(Debug)]
pub struct NamespaceIndex {
    /// topic -> content type -> cache key
    mappings: HashMap<String, HashMap<ContentType, String>>,
    /// Per-topic save frequency, feeding adaptive TTL
    popularity: HashMap<String, u64>,
    /// Popularity at which the adaptive TTL starts to grow
    popularity_threshold: u64,
    /// Cap for adaptively extended TTLs, in milliseconds
    max_ttl_ms: u64,
}

impl NamespaceIndex {
    // == Constructor ==
    /// Creates an empty index.
    ///
    /// # Arguments
    /// * `popularity_threshold` - Saves per topic before TTLs start growing
    /// * `max_ttl_secs` - Upper bound for adaptively extended TTLs
    pub fn new(popularity_threshold: u64, max_ttl_secs: u64) -> Self {
        Self {
            mappings: HashMap::new(),
            popularity: HashMap::new(),
            popularity_threshold,
            max_ttl_ms: max_ttl_secs * 1000,
        }
    }

    // == Get Text ==
    /// Looks up previously stored text for a topic and content type.
    ///
    /// The hit or miss is attributed to the content type in the store's
    /// statistics.
    pub fn get_text(
        &self,
        store: &mut CacheStore,
        topic: &str,
        content_type: ContentType,
    ) -> Option<String> {
        let topic = normalize_topic(topic);
        let key = text_key(&topic, content_type);
        let result = store.get_as(&key, Some(content_type));
        match &result {
            Some(_) => debug!(%topic, %content_type, "Namespace cache hit"),
            None => debug!(%topic, %content_type, "Namespace cache miss"),
        }
        result
    }

    // == Save Text ==
    /// Stores generated text under a topic and content type.
    ///
    /// Bumps the topic's popularity and applies the adaptive TTL: popular
    /// topics keep their entries longer, up to the configured cap.
    pub fn save_text(
        &mut self,
        store: &mut CacheStore,
        topic: &str,
        content_type: ContentType,
        text: String,
        ttl: Ttl,
    ) -> Result<()> {
        let topic = normalize_topic(topic);
        let key = text_key(&topic, content_type);

        // Validate the TTL before any state changes
        let base_ttl_ms = store.resolve_ttl_ms(ttl)?;

        let popularity = {
            let counter = self.popularity.entry(topic.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        let resolved_ttl_ms = base_ttl_ms.map(|base| {
            effective_ttl_ms(base, popularity, self.popularity_threshold, self.max_ttl_ms)
        });

        store.set_raw(key.clone(), text, resolved_ttl_ms)?;
        self.mappings
            .entry(topic.clone())
            .or_default()
            .insert(content_type, key);

        info!(%topic, %content_type, popularity, "Saved generated text to cache");
        Ok(())
    }

    // == Clear Cache ==
    /// Removes cached entries by topic.
    ///
    /// With a filter, only the exact topic's entries and mappings go; with
    /// `None` everything does. The scan is proportional to the number of
    /// distinct topics tracked. Returns the number of store entries removed.
    pub fn clear_cache(&mut self, store: &mut CacheStore, topic_filter: Option<&str>) -> usize {
        let topics: Vec<String> = match topic_filter {
            Some(topic) => {
                let topic = normalize_topic(topic);
                if self.mappings.contains_key(&topic) {
                    vec![topic]
                } else {
                    Vec::new()
                }
            }
            None => self.mappings.keys().cloned().collect(),
        };

        let mut removed = 0;
        for topic in &topics {
            if let Some(keys) = self.mappings.remove(topic) {
                for key in keys.values() {
                    if store.remove(key) {
                        removed += 1;
                    }
                }
            }
            self.popularity.remove(topic);
        }

        if removed > 0 {
            info!(removed, filter = ?topic_filter, "Cleared namespaced cache entries");
        }
        removed
    }

    // == Popularity ==
    /// Returns the save count recorded for a topic.
    pub fn popularity(&self, topic: &str) -> u64 {
        self.popularity
            .get(&normalize_topic(topic))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the distinct topics currently tracked.
    pub fn topics(&self) -> Vec<&str> {
        self.mappings.keys().map(String::as_str).collect()
    }

    // == Snapshot Support ==
    pub(crate) fn snapshot(&self) -> NamespaceSnapshot {
        NamespaceSnapshot {
            mappings: self.mappings.clone(),
            popularity: self.popularity.clone(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: NamespaceSnapshot) {
        self.mappings = snapshot.mappings;
        self.popularity = snapshot.popularity;
    }
}

// == Adaptive TTL ==
/// Effective TTL for a topic as a pure function of its popularity.
///
/// Below the threshold the base TTL is returned unchanged. From the
/// threshold on, the TTL grows by one base-multiple per threshold-multiple
/// of popularity, capped at `max_ttl_ms`. Monotonic in `popularity`.
pub fn effective_ttl_ms(base_ttl_ms: u64, popularity: u64, threshold: u64, max_ttl_ms: u64) -> u64 {
    if threshold == 0 || popularity < threshold {
        return base_ttl_ms;
    }
    let multiplier = 1 + popularity / threshold;
    base_ttl_ms.saturating_mul(multiplier).min(max_ttl_ms)
}

// == Key Derivation ==
/// Derives the flat cache key for a (topic, content type) pair.
fn text_key(topic: &str, content_type: ContentType) -> String {
    derive_key(
        TEXT_KEY_PREFIX,
        &[("topic", topic), ("type", content_type.as_str())],
    )
}

/// Normalizes a topic for keying: trimmed, lowercased.
fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}
