//! Retry with linear backoff for producer calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CacheError, Result};

/// Default number of producer calls per load.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

// == Retry Policy ==
/// How many times to call a producer and how long to wait in between.
///
/// `attempts` counts every call, the first included. The wait after failed
/// attempt `n` is `delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry_attempts, config.retry_delay())
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// Calls `op` until it succeeds or the policy runs out of attempts.
///
/// At least one call is always made. The last failure is returned as
/// [`CacheError::Load`] tagged with `key`.
pub async fn retry_with_backoff<T, E, F, Fut>(
    key: &str,
    policy: RetryPolicy,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(key, attempt, "Load succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < attempts => {
                let wait = policy.backoff(attempt);
                warn!(
                    key,
                    attempt,
                    attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "Load attempt failed, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(key, attempts, error = %err, "Load failed, giving up");
                return Err(CacheError::Load {
                    key: key.to_string(),
                    attempts: attempt,
                    message: err.to_string(),
                });
            }
        }
    }
}
