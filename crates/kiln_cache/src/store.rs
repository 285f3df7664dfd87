//! A keyed, unbounded, in-memory store.

use std::collections::HashMap;

use kiln_common::MethodRef;

use crate::stats::CacheStats;

/// An unbounded in-memory map from method identity to a cached value.
///
/// There is exactly one value per key: [`put`](Self::put) overwrites
/// unconditionally and nothing is ever evicted or expired. The store is not
/// synchronized; the worker only touches it from the single active pipeline.
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: HashMap<MethodRef, V>,
    stats: CacheStats,
}

impl<V: Clone> MemoryStore<V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Looks up the value stored for `key`, counting a hit or a miss.
    pub fn get(&mut self, key: &MethodRef) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Stores `value` for `key`, replacing any earlier value.
    pub fn put(&mut self, key: MethodRef, value: V) {
        self.stats.writes += 1;
        self.entries.insert(key, value);
    }

    /// Returns `true` if a value is stored for `key` without counting a lookup.
    pub fn contains(&self, key: &MethodRef) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the lookup/write counters.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl<V: Clone> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> MethodRef {
        MethodRef::new("Hello", name, "()V")
    }

    #[test]
    fn get_missing_counts_miss() {
        let mut store: MemoryStore<u32> = MemoryStore::new();
        assert!(store.get(&key("a")).is_none());
        assert_eq!(store.stats().misses, 1);
        assert_eq!(store.stats().hits, 0);
    }

    #[test]
    fn put_then_get() {
        let mut store = MemoryStore::new();
        store.put(key("a"), 7u32);
        assert_eq!(store.get(&key("a")), Some(7));
        assert_eq!(store.stats().hits, 1);
        assert_eq!(store.stats().writes, 1);
    }

    #[test]
    fn put_overwrites() {
        let mut store = MemoryStore::new();
        store.put(key("a"), 1u32);
        store.put(key("a"), 2u32);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("a")), Some(2));
        assert_eq!(store.stats().writes, 2);
    }

    #[test]
    fn descriptor_is_part_of_identity() {
        let mut store = MemoryStore::new();
        store.put(MethodRef::new("Hello", "f", "()V"), 1u32);
        assert!(store.get(&MethodRef::new("Hello", "f", "(I)V")).is_none());
    }

    #[test]
    fn contains_does_not_count() {
        let mut store = MemoryStore::new();
        store.put(key("a"), 1u32);
        assert!(store.contains(&key("a")));
        assert_eq!(store.stats().lookups(), 0);
    }
}
