//! Throttle
//!
//! Leading-edge rate limiting: calls made during the cooldown are dropped,
//! never deferred.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

struct Inner<A> {
    func: Arc<dyn Fn(A) + Send + Sync>,
    interval: Duration,
    /// End of the current cooldown, None = not throttled
    cooling_until: Mutex<Option<Instant>>,
}

// == Throttled ==
/// Throttled wrapper around a callback. Clones share the same cooldown.
pub struct Throttled<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for Throttled<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Wraps `func` so it runs at most once per `interval`.
pub fn throttle<A, F>(func: F, interval: Duration) -> Throttled<A>
where
    F: Fn(A) + Send + Sync + 'static,
{
    Throttled {
        inner: Arc::new(Inner {
            func: Arc::new(func),
            interval,
            cooling_until: Mutex::new(None),
        }),
    }
}

impl<A> Throttled<A> {
    /// Invokes right away unless cooling down. Returns whether it ran.
    pub fn call(&self, args: A) -> bool {
        let now = Instant::now();
        {
            let mut cooling_until = self
                .inner
                .cooling_until
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if matches!(*cooling_until, Some(until) if now < until) {
                trace!("Throttled call dropped");
                return false;
            }
            *cooling_until = Some(now + self.inner.interval);
        }
        (self.inner.func)(args);
        true
    }

    pub fn is_throttled(&self) -> bool {
        let cooling_until = self
            .inner
            .cooling_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        matches!(*cooling_until, Some(until) if Instant::now() < until)
    }
}
