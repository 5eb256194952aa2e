//! Debounce
//!
//! Collapses bursts of calls into one invocation after a quiet period.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

struct State<A> {
    timer: Option<JoinHandle<()>>,
    pending: Option<A>,
    /// Bumped whenever the current timer is replaced or cancelled, so a
    /// timer that already woke up can tell it is stale.
    generation: u64,
}

struct Inner<A> {
    func: Callback<A>,
    delay: Duration,
    immediate: bool,
    state: Mutex<State<A>>,
}

impl<A> Inner<A> {
    fn lock(&self) -> MutexGuard<'_, State<A>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, generation: u64) {
        let args = {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            state.timer = None;
            state.pending.take()
        };
        if self.immediate {
            return;
        }
        if let Some(args) = args {
            trace!("Debounce timer fired");
            (self.func)(args);
        }
    }
}

// == Debounced ==
/// Debounced wrapper around a callback. Clones share the same timer.
///
/// Timers run on the tokio runtime, so `call` must be made from inside one.
pub struct Debounced<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for Debounced<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Wraps `func` so it runs once `delay` has passed without another call.
///
/// Trailing mode (`immediate == false`) invokes with the last arguments
/// when the timer fires. Leading mode invokes right away when no timer is
/// pending and stays silent for the rest of the burst.
pub fn debounce<A, F>(func: F, delay: Duration, immediate: bool) -> Debounced<A>
where
    F: Fn(A) + Send + Sync + 'static,
{
    Debounced {
        inner: Arc::new(Inner {
            func: Arc::new(func),
            delay,
            immediate,
            state: Mutex::new(State {
                timer: None,
                pending: None,
                generation: 0,
            }),
        }),
    }
}

impl<A> Debounced<A>
where
    A: Clone + Send + 'static,
{
    /// Records `args` and restarts the quiet-period timer.
    pub fn call(&self, args: A) {
        let leading = {
            let mut state = self.inner.lock();
            let idle = state.timer.is_none();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.generation += 1;
            let generation = state.generation;
            let leading = (self.inner.immediate && idle).then(|| args.clone());
            state.pending = Some(args);

            let inner = Arc::clone(&self.inner);
            state.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(inner.delay).await;
                inner.fire(generation);
            }));
            leading
        };

        if let Some(args) = leading {
            trace!("Debounce leading call");
            (self.inner.func)(args);
        }
    }

    /// Drops the pending call without invoking.
    pub fn cancel(&self) {
        let mut state = self.inner.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.pending = None;
        state.generation += 1;
    }

    /// Runs the pending call now, if there is one.
    pub fn flush(&self) {
        let args = {
            let mut state = self.inner.lock();
            match state.timer.take() {
                Some(timer) => {
                    timer.abort();
                    state.generation += 1;
                    state.pending.take()
                }
                None => None,
            }
        };
        if let Some(args) = args {
            (self.inner.func)(args);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().timer.is_some()
    }
}
