//! Bounded LRU cache map
//!
//! The owning struct is the only mutator of its entries, which is what
//! keeps the memory manager lock-light: one short critical section per
//! operation, never held across I/O.

use hivemind_domain::CacheEntry;
use std::collections::HashMap;

/// A capacity-bounded map of [`CacheEntry`]s with strict LRU eviction
/// by `last_accessed_at`.
///
/// Eviction is a linear scan; at the default bound of 10,000 entries that
/// is cheap, and the eviction order stays LRU-equivalent if an O(1)
/// structure ever replaces it.
#[derive(Debug)]
pub struct CacheMap {
    entries: HashMap<String, CacheEntry>,
    capacity: usize,
}

impl CacheMap {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Look up an entry, refreshing its access bookkeeping on hit
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        let entry = self.entries.get_mut(key)?;
        entry.touch();
        Some(entry)
    }

    /// Mutable access without touching LRU state (replica bookkeeping)
    pub fn get_untouched_mut(&mut self, key: &str) -> Option<&mut CacheEntry> {
        self.entries.get_mut(key)
    }

    /// Insert or replace an entry, evicting the least-recently-accessed
    /// entry first when the map is at capacity. Returns the evicted key.
    pub fn insert(&mut self, entry: CacheEntry) -> Option<String> {
        let mut evicted = None;
        if !self.entries.contains_key(&entry.key) && self.entries.len() >= self.capacity {
            if let Some(lru_key) = self
                .entries
                .values()
                .min_by_key(|e| e.last_accessed_at)
                .map(|e| e.key.clone())
            {
                self.entries.remove(&lru_key);
                evicted = Some(lru_key);
            }
        }
        self.entries.insert(entry.key.clone(), entry);
        evicted
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sum of approximate entry sizes
    pub fn total_size_bytes(&self) -> usize {
        self.entries.values().map(|e| e.size_bytes).sum()
    }
}
