//! Cached computation keyed by a base key and its dependency list.

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::memo::deps_changed;

/// Stores results under `key + json(deps)` and recomputes whenever the
/// dependency list changes from the previous call.
pub struct CachedComputation<D, T> {
    key: String,
    cache: SharedCache<T>,
    last_deps: Option<Vec<D>>,
}

impl<D, T> CachedComputation<D, T>
where
    D: Serialize + PartialEq + Clone,
    T: Clone,
{
    pub fn new(key: impl Into<String>, cache: SharedCache<T>) -> Self {
        Self {
            key: key.into(),
            cache,
            last_deps: None,
        }
    }

    /// Returns the cached result for `deps`, running `compute` when the
    /// dependencies changed or the cache no longer holds a result.
    pub async fn get<F>(&mut self, deps: &[D], compute: F) -> T
    where
        F: FnOnce() -> T,
    {
        let composite = match serde_json::to_string(deps) {
            Ok(encoded) => format!("{}{}", self.key, encoded),
            Err(err) => {
                warn!(
                    key = %self.key,
                    error = %err,
                    "Dependency encoding failed, computing uncached"
                );
                return compute();
            }
        };
        let changed = match &self.last_deps {
            Some(prev) => deps_changed(prev, deps),
            None => true,
        };

        let mut cache = self.cache.write().await;
        if !changed {
            if let Some(value) = cache.get(&composite) {
                return value;
            }
        }

        debug!(key = %composite, changed, "Computing");
        let value = compute();
        cache.set(&composite, value.clone());
        drop(cache);
        self.last_deps = Some(deps.to_vec());
        value
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}
