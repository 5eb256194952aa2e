//! Memoize
//!
//! Caches a function's results by argument, bounded by an LRU.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::warn;

use crate::cache::LruCache;

/// Default number of results kept per memoized function.
pub const DEFAULT_MEMO_SIZE: usize = 100;

type KeyFn<A> = Box<dyn Fn(&A) -> String + Send + Sync>;

// == Memoized ==
/// Function wrapper that reuses results for repeated arguments.
///
/// Results are kept until evicted; there is no expiry.
pub struct Memoized<A, R> {
    func: Box<dyn Fn(&A) -> R + Send + Sync>,
    key_fn: Option<KeyFn<A>>,
    cache: Mutex<LruCache<String, R>>,
}

/// Memoizes `func`, keying results by the JSON encoding of the arguments.
pub fn memoize<A, R, F>(func: F, max_cache_size: usize) -> Memoized<A, R>
where
    F: Fn(&A) -> R + Send + Sync + 'static,
{
    Memoized {
        func: Box::new(func),
        key_fn: None,
        cache: Mutex::new(LruCache::new(max_cache_size)),
    }
}

/// Memoizes `func` with a caller-supplied cache key.
pub fn memoize_with_key<A, R, F, K>(func: F, max_cache_size: usize, key_fn: K) -> Memoized<A, R>
where
    F: Fn(&A) -> R + Send + Sync + 'static,
    K: Fn(&A) -> String + Send + Sync + 'static,
{
    Memoized {
        func: Box::new(func),
        key_fn: Some(Box::new(key_fn)),
        cache: Mutex::new(LruCache::new(max_cache_size)),
    }
}

impl<A, R> Memoized<A, R>
where
    A: Serialize,
    R: Clone,
{
    /// Returns the cached result for `args`, computing it on a miss.
    ///
    /// Arguments that cannot be encoded are computed without caching.
    pub fn call(&self, args: &A) -> R {
        let key = match &self.key_fn {
            Some(key_fn) => key_fn(args),
            None => match serde_json::to_string(args) {
                Ok(key) => key,
                Err(err) => {
                    warn!(error = %err, "Memoize key encoding failed, calling through");
                    return (self.func)(args);
                }
            },
        };

        if let Some(hit) = self.lock().get(&key) {
            return hit.clone();
        }

        // Lock released while computing so `func` may recurse into `call`
        let result = (self.func)(args);
        self.lock().set(key, result.clone());
        result
    }
}

impl<A, R> Memoized<A, R> {
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, R>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A, R> fmt::Debug for Memoized<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("cached", &self.cache_len())
            .field("custom_key", &self.key_fn.is_some())
            .finish()
    }
}
