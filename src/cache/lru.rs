//! LRU Cache Module
//!
//! Fixed-capacity map with recency-ordered eviction.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

// == LRU Cache ==
/// Fixed-capacity map that evicts the least recently used key.
///
/// Keys are ordered in a VecDeque where:
/// - Front = Most recently used
/// - Back = Least recently used
///
/// `get` and `set` promote a key; `has` never does.
#[derive(Debug)]
pub struct LruCache<K, V> {
    /// Key-value storage
    entries: HashMap<K, V>,
    /// Order of keys by recency
    order: VecDeque<K>,
    /// Maximum number of entries
    max_size: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty cache holding at most `max_size` entries.
    ///
    /// A `max_size` of zero is treated as one.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: HashMap::with_capacity(max_size),
            order: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    // == Get ==
    /// Returns the value and marks the key most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.promote(key);
        self.entries.get(key)
    }

    /// Mutable variant of [`get`](Self::get), also promoting.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.promote(key);
        self.entries.get_mut(key)
    }

    // == Set ==
    /// Inserts or replaces a value, returning the evicted pair if any.
    ///
    /// Replacing an existing key promotes it without evicting. A new key at
    /// capacity first evicts the least recently used entry.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.entries.contains_key(&key) {
            self.promote(&key);
            self.entries.insert(key, value);
            return None;
        }

        let evicted = if self.entries.len() >= self.max_size {
            self.pop_lru()
        } else {
            None
        };

        self.order.push_front(key.clone());
        self.entries.insert(key, value);
        evicted
    }

    // == Has ==
    /// Existence check that leaves recency untouched.
    pub fn has(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    // == Remove ==
    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(value)
    }

    // == Peek LRU ==
    /// Returns the next key to be evicted without removing it.
    pub fn peek_lru(&self) -> Option<&K> {
        self.order.back()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn promote(&mut self, key: &K) {
        if self.order.front() == Some(key) {
            return;
        }
        self.order.retain(|k| k != key);
        self.order.push_front(key.clone());
    }

    fn pop_lru(&mut self) -> Option<(K, V)> {
        let key = self.order.pop_back()?;
        let value = self.entries.remove(&key)?;
        Some((key, value))
    }
}
