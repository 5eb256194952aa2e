//! Cache Module
//!
//! Provides an insertion-ordered LRU map and a TTL cache over pluggable
//! storage backends.

mod advanced;
mod clock;
mod codec;
mod entry;
mod lru;
mod stats;
mod storage;

#[cfg(test)]
mod property_tests;

use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use advanced::{
    AdvancedCache, CacheOptions, ExpireCallback, DEFAULT_KEY_PREFIX, DEFAULT_MAX_SIZE,
    DEFAULT_TTL,
};
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use codec::{Codec, JsonCodec};
pub use entry::CacheEntry;
pub use lru::LruCache;
pub use stats::CacheStats;
pub use storage::{Backend, LocalStorage, SessionStorage, StorageArea, StorageKind};

/// A cache shared between async tasks. Reads need the write lock because
/// they update access statistics.
pub type SharedCache<T> = Arc<RwLock<AdvancedCache<T>>>;
