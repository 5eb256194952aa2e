//! Stable callback: one handle whose target can be swapped.

use std::sync::{Arc, PoisonError, RwLock};

type Target<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// Handle that always calls the most recently installed function.
/// Clones share the same target.
pub struct StableCallback<A, R> {
    target: Arc<RwLock<Target<A, R>>>,
}

impl<A, R> Clone for StableCallback<A, R> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
        }
    }
}

impl<A, R> StableCallback<A, R> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self {
            target: Arc::new(RwLock::new(Arc::new(func))),
        }
    }

    pub fn update<F>(&self, func: F)
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        *self.target.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(func);
    }

    pub fn call(&self, args: A) -> R {
        // Clone out so the target may call `update` on this handle
        let target = Arc::clone(&self.target.read().unwrap_or_else(PoisonError::into_inner));
        target(args)
    }
}
