//! Advanced Cache Module
//!
//! TTL-aware cache over a pluggable backend: an in-process map with
//! least-recently-accessed eviction, or a shared storage area where entries
//! live as encoded strings under `key_prefix + key`.
//!
//! Expiry is checked on read; nothing runs in the background. The cache is
//! best-effort: storage and codec failures are logged and treated as a miss
//! on read or a no-op on write, never returned to the caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{
    Backend, CacheEntry, CacheStats, Clock, Codec, JsonCodec, SharedCache, StorageArea,
    StorageKind, SystemClock,
};
use crate::cache::entry::ttl_ms;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default memory-backend capacity.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Default namespace for storage-area keys.
pub const DEFAULT_KEY_PREFIX: &str = "cache_";

/// Called with the key and value of every entry removed because it expired.
pub type ExpireCallback<T> = Arc<dyn Fn(&str, &T) + Send + Sync>;

// == Cache Options ==
/// Construction-time configuration. Fixed once the cache is built.
pub struct CacheOptions<T> {
    pub ttl: Duration,
    /// Capacity of the memory backend; storage areas are unbounded
    pub max_size: usize,
    pub backend: Backend,
    pub key_prefix: String,
    pub on_expire: Option<ExpireCallback<T>>,
    pub codec: Arc<dyn Codec<T>>,
    pub clock: Arc<dyn Clock>,
}

impl<T> CacheOptions<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// Memory backend, JSON codec, wall clock and default limits.
    pub fn new() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_size: DEFAULT_MAX_SIZE,
            backend: Backend::Memory,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            on_expire: None,
            codec: Arc::new(JsonCodec::new()),
            clock: Arc::new(SystemClock),
        }
    }
}

impl<T> Default for CacheOptions<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CacheOptions<T> {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn on_expire<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &T) + Send + Sync + 'static,
    {
        self.on_expire = Some(Arc::new(callback));
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec<T>>) -> Self {
        self.codec = codec;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<T> fmt::Debug for CacheOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("ttl", &self.ttl)
            .field("max_size", &self.max_size)
            .field("backend", &self.backend)
            .field("key_prefix", &self.key_prefix)
            .field("on_expire", &self.on_expire.is_some())
            .field("codec", &self.codec)
            .field("clock", &self.clock)
            .finish()
    }
}

/// Memory-backend slot. `seq` is the first-insertion order, kept across
/// overwrites, and breaks `last_accessed` ties during eviction.
#[derive(Debug)]
struct Slot<T> {
    seq: u64,
    entry: CacheEntry<T>,
}

// == Advanced Cache ==
/// TTL cache with access statistics and a pluggable backend.
///
/// Reads hand out clones of the stored value; the cache owns its entries.
pub struct AdvancedCache<T> {
    options: CacheOptions<T>,
    /// Entries of the memory backend, unused for storage areas
    memory: HashMap<String, Slot<T>>,
    next_seq: u64,
    stats: CacheStats,
}

impl<T: Clone> AdvancedCache<T> {
    // == Constructor ==
    /// Creates an empty cache. A `max_size` of zero is treated as one.
    pub fn new(mut options: CacheOptions<T>) -> Self {
        options.max_size = options.max_size.max(1);
        debug!(
            backend = %options.backend.kind(),
            ttl_ms = ttl_ms(options.ttl),
            max_size = options.max_size,
            prefix = %options.key_prefix,
            "Created cache"
        );
        Self {
            options,
            memory: HashMap::new(),
            next_seq: 0,
            stats: CacheStats::new(),
        }
    }

    /// Wraps the cache for sharing between async tasks.
    pub fn into_shared(self) -> SharedCache<T> {
        Arc::new(RwLock::new(self))
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// An expired entry is removed, reported to `on_expire`, and reads as a
    /// miss. A hit refreshes `last_accessed` and `access_count` and, for
    /// storage areas, writes the updated entry back.
    pub fn get(&mut self, key: &str) -> Option<T> {
        let now = self.options.clock.now_ms();
        let found = match self.options.backend.area().cloned() {
            None => self.memory_get(key, now),
            Some(area) => self.area_get(area.as_ref(), key, now),
        };

        if found.is_some() {
            self.stats.record_hit();
            debug!(key, "Cache hit");
        } else {
            self.stats.record_miss();
            debug!(key, "Cache miss");
        }
        found
    }

    fn memory_get(&mut self, key: &str, now: u64) -> Option<T> {
        let ttl = self.options.ttl;
        if self.memory.get(key)?.entry.is_expired(now, ttl) {
            if let Some(slot) = self.memory.remove(key) {
                self.expire(key, &slot.entry.value);
            }
            return None;
        }

        let slot = self.memory.get_mut(key)?;
        slot.entry.touch(now);
        Some(slot.entry.value.clone())
    }

    fn area_get(&mut self, area: &dyn StorageArea, key: &str, now: u64) -> Option<T> {
        let storage_key = self.storage_key(key);
        let mut entry = self.read_area(area, &storage_key)?;

        if entry.is_expired(now, self.options.ttl) {
            if let Err(err) = area.remove_item(&storage_key) {
                warn!(key = %storage_key, error = %err, "Failed to remove expired entry");
            }
            self.expire(key, &entry.value);
            return None;
        }

        entry.touch(now);
        self.write_area(area, &storage_key, &entry);
        Some(entry.value)
    }

    // == Set ==
    /// Stores `value` under `key` with a fresh timestamp.
    ///
    /// On the memory backend a new key at capacity first evicts the entry
    /// with the oldest `last_accessed`.
    pub fn set(&mut self, key: &str, value: T) {
        let now = self.options.clock.now_ms();
        let entry = CacheEntry::new(value, now);

        match self.options.backend.area().cloned() {
            None => {
                if let Some(slot) = self.memory.get_mut(key) {
                    slot.entry = entry;
                    return;
                }
                if self.memory.len() >= self.options.max_size {
                    self.evict_least_recently_accessed();
                }
                let seq = self.next_seq;
                self.next_seq += 1;
                self.memory.insert(key.to_string(), Slot { seq, entry });
            }
            Some(area) => {
                let storage_key = self.storage_key(key);
                self.write_area(area.as_ref(), &storage_key, &entry);
            }
        }
    }

    /// Returns the cached value, computing and storing it on a miss.
    pub fn get_or_insert_with<F>(&mut self, key: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = f();
        self.set(key, value.clone());
        value
    }

    // == Has ==
    /// Same as `get(key).is_some()`, including expiry cleanup and stats.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Delete ==
    /// Removes `key`, returning whether it was present.
    ///
    /// A removal the storage area rejects is logged and leaves the entry
    /// readable.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.options.backend.area() {
            None => self.memory.remove(key).is_some(),
            Some(area) => {
                let storage_key = self.storage_key(key);
                match area.get_item(&storage_key) {
                    Ok(Some(_)) => match area.remove_item(&storage_key) {
                        Ok(()) => true,
                        Err(err) => {
                            warn!(key = %storage_key, error = %err, "Failed to delete entry");
                            true
                        }
                    },
                    Ok(None) => false,
                    Err(err) => {
                        warn!(key = %storage_key, error = %err, "Failed to read entry for delete");
                        false
                    }
                }
            }
        }
    }

    // == Clear ==
    /// Removes every entry owned by this cache.
    ///
    /// Storage areas only lose keys under this cache's prefix.
    pub fn clear(&mut self) {
        match self.options.backend.area() {
            None => self.memory.clear(),
            Some(area) => {
                for storage_key in self.owned_storage_keys(area.as_ref()) {
                    if let Err(err) = area.remove_item(&storage_key) {
                        warn!(key = %storage_key, error = %err, "Failed to clear entry");
                    }
                }
            }
        }
    }

    // == Purge Expired ==
    /// Removes all expired entries now instead of waiting for a read.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.options.clock.now_ms();
        let ttl = self.options.ttl;
        let mut expired = Vec::new();

        match self.options.backend.area().cloned() {
            None => {
                let keys: Vec<String> = self
                    .memory
                    .iter()
                    .filter(|(_, slot)| slot.entry.is_expired(now, ttl))
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in keys {
                    if let Some(slot) = self.memory.remove(&key) {
                        expired.push((key, slot.entry.value));
                    }
                }
            }
            Some(area) => {
                for storage_key in self.owned_storage_keys(area.as_ref()) {
                    let Some(entry) = self.read_area(area.as_ref(), &storage_key) else {
                        continue;
                    };
                    if !entry.is_expired(now, ttl) {
                        continue;
                    }
                    match area.remove_item(&storage_key) {
                        Ok(()) => {
                            let key = storage_key[self.options.key_prefix.len()..].to_string();
                            expired.push((key, entry.value));
                        }
                        Err(err) => {
                            warn!(
                                key = %storage_key,
                                error = %err,
                                "Failed to remove expired entry"
                            );
                        }
                    }
                }
            }
        }

        let count = expired.len();
        for (key, value) in expired {
            self.expire(&key, &value);
        }
        if count > 0 {
            debug!(count, "Purged expired entries");
        }
        count
    }

    // == Stats ==
    /// Returns counters plus the current size.
    ///
    /// For storage areas the size is found by scanning every key in the
    /// area and counting those under this cache's prefix.
    pub fn get_stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.size = self.len();
        stats
    }

    /// Keys owned by this cache, prefix stripped, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        match self.options.backend.area() {
            None => self.memory.keys().cloned().collect(),
            Some(area) => {
                let prefix_len = self.options.key_prefix.len();
                self.owned_storage_keys(area.as_ref())
                    .into_iter()
                    .map(|k| k[prefix_len..].to_string())
                    .collect()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.options.backend.area() {
            None => self.memory.len(),
            Some(area) => self.owned_storage_keys(area.as_ref()).len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.options.ttl
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.options.backend.kind()
    }

    pub fn key_prefix(&self) -> &str {
        &self.options.key_prefix
    }

    // == Internals ==

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.options.key_prefix, key)
    }

    fn owned_storage_keys(&self, area: &dyn StorageArea) -> Vec<String> {
        match area.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(&self.options.key_prefix))
                .collect(),
            Err(err) => {
                warn!(error = %err, "Failed to list storage keys");
                Vec::new()
            }
        }
    }

    fn read_area(&self, area: &dyn StorageArea, storage_key: &str) -> Option<CacheEntry<T>> {
        let raw = match area.get_item(storage_key) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(key = %storage_key, error = %err, "Storage read failed");
                return None;
            }
        };
        match self.options.codec.decode(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(key = %storage_key, error = %err, "Discarding undecodable entry");
                None
            }
        }
    }

    fn write_area(&self, area: &dyn StorageArea, storage_key: &str, entry: &CacheEntry<T>) {
        let raw = match self.options.codec.encode(entry) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %storage_key, error = %err, "Failed to encode entry");
                return;
            }
        };
        if let Err(err) = area.set_item(storage_key, &raw) {
            warn!(key = %storage_key, error = %err, "Storage write failed");
        }
    }

    fn evict_least_recently_accessed(&mut self) {
        let victim = self
            .memory
            .iter()
            .min_by_key(|(_, slot)| (slot.entry.last_accessed, slot.seq))
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            self.memory.remove(&key);
            self.stats.record_eviction();
            debug!(key = %key, "Evicted least recently accessed entry");
        }
    }

    fn expire(&mut self, key: &str, value: &T) {
        self.stats.record_expiration();
        debug!(key, "Entry expired");
        if let Some(callback) = &self.options.on_expire {
            callback(key, value);
        }
    }
}

impl<T> fmt::Debug for AdvancedCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvancedCache")
            .field("options", &self.options)
            .field("memory_entries", &self.memory.len())
            .field("stats", &self.stats)
            .finish()
    }
}
