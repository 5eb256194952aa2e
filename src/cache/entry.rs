//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access metadata.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// Represents a single cache entry with value and access metadata.
///
/// Serialized as `{ value, timestamp, lastAccessed, accessCount }` when the
/// entry is persisted into a storage area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The stored value
    pub value: T,
    /// Creation or refresh timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Last successful read (Unix milliseconds)
    pub last_accessed: u64,
    /// Number of successful reads, starting at 1 on insert
    pub access_count: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a fresh entry stamped at `now_ms`.
    pub fn new(value: T, now_ms: u64) -> Self {
        Self {
            value,
            timestamp: now_ms,
            last_accessed: now_ms,
            access_count: 1,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `ttl`.
    ///
    /// Boundary condition: an entry read exactly `ttl` after creation is still
    /// live; it expires once strictly more than `ttl` has elapsed.
    pub fn is_expired(&self, now_ms: u64, ttl: Duration) -> bool {
        now_ms.saturating_sub(self.timestamp) > ttl_ms(ttl)
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_accessed = now_ms;
        self.access_count += 1;
    }

    /// Returns remaining TTL in milliseconds, `0` once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64, ttl: Duration) -> u64 {
        let expires = self.timestamp.saturating_add(ttl_ms(ttl));
        expires.saturating_sub(now_ms)
    }
}

/// `ttl` in whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn ttl_ms(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}
