//! LRU Tracker Module
//!
//! Tracks access recency for eviction ordering.

use std::collections::VecDeque;

// == LRU Tracker ==
/// Recency ordering of cache keys.
///
/// Keys live in a VecDeque with the most recently used key at the front and
/// the least recently used at the back. Keys that are inserted and never
/// touched again keep their insertion order, which gives the required
/// earliest-inserted-first tie break for eviction.
#[derive(Debug, Default)]
pub struct LruTracker {
    order: VecDeque<String>,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if unknown.
    pub fn touch(&mut self, key: &str) {
        self.forget(key);
        self.order.push_front(key.to_string());
    }

    // == Forget ==
    /// Drops a key from the ordering. Unknown keys are a no-op.
    pub fn forget(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Pop LRU ==
    /// Removes and returns the least recently used key, if any.
    pub fn pop_lru(&mut self) -> Option<String> {
        self.order.pop_back()
    }

    // == Peek LRU ==
    /// Returns the least recently used key without removing it.
    pub fn peek_lru(&self) -> Option<&String> {
        self.order.back()
    }

    // == Clear ==
    /// Drops all tracked keys.
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Contains ==
    /// Checks whether a key is tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }
}
