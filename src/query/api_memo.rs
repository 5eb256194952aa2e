//! API memo
//!
//! Cached loads where concurrent callers for the same key share one
//! in-flight producer call.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::cache::SharedCache;
use crate::error::Result;
use crate::query::{retry_with_backoff, QueryState, RetryPolicy};

type InFlight<T> = Shared<BoxFuture<'static, Result<T>>>;

// == Api Memo ==
/// Deduplicating loader over a shared cache. Clones share in-flight loads.
pub struct ApiMemo<T> {
    cache: SharedCache<T>,
    in_flight: Arc<Mutex<HashMap<String, InFlight<T>>>>,
    policy: RetryPolicy,
}

impl<T> Clone for ApiMemo<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            in_flight: Arc::clone(&self.in_flight),
            policy: self.policy,
        }
    }
}

impl<T> ApiMemo<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(cache: SharedCache<T>, policy: RetryPolicy) -> Self {
        Self {
            cache,
            in_flight: Arc::default(),
            policy,
        }
    }

    // == Fetch ==
    /// Returns the cached value or joins/starts the load for `key`.
    ///
    /// Only the caller that starts a load supplies the producer; callers
    /// joining an in-flight load drop theirs unused. A failed load clears
    /// `key` from the cache.
    pub async fn fetch<F, Fut, E>(&self, key: &str, loader: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let cached = self.cache.write().await.get(key);
        if let Some(value) = cached {
            return Ok(value);
        }

        let load = {
            let mut in_flight = self.lock_in_flight();
            match in_flight.get(key) {
                Some(load) => {
                    debug!(key, "Joining in-flight load");
                    load.clone()
                }
                None => {
                    let load = self.start_load(key.to_string(), loader);
                    in_flight.insert(key.to_string(), load.clone());
                    load
                }
            }
        };
        load.await
    }

    /// Like [`fetch`](Self::fetch) but folds the outcome into query state.
    pub async fn query<F, Fut, E>(&self, key: &str, loader: F) -> QueryState<T>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        match self.fetch(key, loader).await {
            Ok(value) => QueryState::loaded(value),
            Err(err) => QueryState::failed(err),
        }
    }

    /// Drops the cached value for `key`. An in-flight load is unaffected.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.cache.write().await.delete(key)
    }

    /// Number of keys with a load currently running.
    pub fn in_flight_len(&self) -> usize {
        self.lock_in_flight().len()
    }

    fn start_load<F, Fut, E>(&self, key: String, loader: F) -> InFlight<T>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);
        let policy = self.policy;
        debug!(key = %key, "Starting load");

        async move {
            let result = retry_with_backoff(&key, policy, loader).await;
            {
                let mut cache = cache.write().await;
                match &result {
                    Ok(value) => cache.set(&key, value.clone()),
                    Err(_) => {
                        cache.delete(&key);
                    }
                }
            }
            in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
            result
        }
        .boxed()
        .shared()
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlight<T>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AdvancedCache, CacheOptions};
    use crate::error::CacheError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn memo() -> ApiMemo<String> {
        ApiMemo::new(
            AdvancedCache::new(CacheOptions::new()).into_shared(),
            RetryPolicy::new(3, Duration::from_millis(10)),
        )
    }

    fn slow_loader(
        calls: Arc<AtomicU32>,
    ) -> impl FnMut() -> BoxFuture<'static, std::result::Result<String, String>> + Send + 'static {
        move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok("profile".to_string())
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_one_call() {
        let memo = memo();
        let calls = Arc::new(AtomicU32::new(0));

        let (a, b, c) = tokio::join!(
            memo.fetch("user:1", slow_loader(calls.clone())),
            memo.fetch("user:1", slow_loader(calls.clone())),
            memo.fetch("user:1", slow_loader(calls.clone())),
        );

        assert_eq!(a.unwrap(), "profile");
        assert_eq!(b.unwrap(), "profile");
        assert_eq!(c.unwrap(), "profile");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.in_flight_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_keys_load_separately() {
        let memo = memo();
        let calls = Arc::new(AtomicU32::new(0));

        let (a, b) = tokio::join!(
            memo.fetch("user:1", slow_loader(calls.clone())),
            memo.fetch("user:2", slow_loader(calls.clone())),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_load_is_cached() {
        let memo = memo();
        let calls = Arc::new(AtomicU32::new(0));

        memo.fetch("user:1", slow_loader(calls.clone())).await.unwrap();
        memo.fetch("user:1", slow_loader(calls.clone())).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(memo.invalidate("user:1").await);
        memo.fetch("user:1", slow_loader(calls.clone())).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_shared_and_not_cached() {
        let memo = memo();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let failing = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<String, _>("503") }
        };

        let (a, b) = tokio::join!(
            memo.query("user:1", failing.clone()),
            memo.query("user:1", failing),
        );

        assert!(matches!(a.error, Some(CacheError::Load { attempts: 3, .. })));
        assert_eq!(a.error, b.error);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(memo.in_flight_len(), 0);
        assert!(!memo.invalidate("user:1").await);
    }
}
