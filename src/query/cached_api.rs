//! Cached API query
//!
//! Binds one cache key to a producer. Loads read the cache first and fall
//! back to the producer with retry. Concurrent loads of the same key are
//! not merged; each one calls the producer. Use `ApiMemo` for that.

use std::fmt::Display;
use std::future::Future;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::cache::SharedCache;
use crate::query::{retry_with_backoff, QueryState, RetryPolicy};

// == Cached Api ==
/// Query handle for a single cache key.
///
/// The key is the only cache input; callers must fold any producer
/// arguments into it themselves.
pub struct CachedApi<T, F> {
    key: String,
    cache: SharedCache<T>,
    loader: F,
    policy: RetryPolicy,
    state: watch::Sender<QueryState<T>>,
}

impl<T, F, Fut, E> CachedApi<T, F>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    E: Display,
{
    pub fn new(
        key: impl Into<String>,
        cache: SharedCache<T>,
        loader: F,
        policy: RetryPolicy,
    ) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            key: key.into(),
            cache,
            loader,
            policy,
            state,
        }
    }

    /// Receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    // == Load ==
    /// Serves from the cache when possible, otherwise calls the producer.
    pub async fn load(&self) -> QueryState<T> {
        self.run(false).await
    }

    // == Refresh ==
    /// Calls the producer even if the cache holds a live value.
    pub async fn refresh(&self) -> QueryState<T> {
        self.run(true).await
    }

    /// Points the handle at a new key and loads it. Same key is a no-op.
    pub async fn set_key(&mut self, key: impl Into<String>) -> QueryState<T> {
        let key = key.into();
        if key == self.key {
            return self.state();
        }
        self.key = key;
        self.state.send_replace(QueryState::default());
        self.load().await
    }

    async fn run(&self, bypass_cache: bool) -> QueryState<T> {
        if !bypass_cache {
            let cached = self.cache.write().await.get(&self.key);
            if let Some(value) = cached {
                debug!(key = %self.key, "Serving query from cache");
                self.state.send_replace(QueryState::cached(value));
                return self.state();
            }
        }

        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        match retry_with_backoff(&self.key, self.policy, || (self.loader)()).await {
            Ok(value) => {
                self.cache.write().await.set(&self.key, value.clone());
                info!(key = %self.key, "Query loaded");
                self.state.send_replace(QueryState::loaded(value));
            }
            Err(err) => {
                // Drop whatever the cache held so the key is not left poisoned
                self.cache.write().await.delete(&self.key);
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.is_from_cache = false;
                    state.error = Some(err);
                });
            }
        }
        self.state()
    }
}
