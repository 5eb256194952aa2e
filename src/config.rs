//! Configuration Module
//!
//! Loads cache and retry settings from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::StorageKind;

/// Cache and retry configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Entry time-to-live in milliseconds
    pub ttl_ms: u64,
    /// Maximum number of entries held by the memory backend
    pub max_size: usize,
    /// Which storage backend caches use
    pub storage: StorageKind,
    /// Namespace prepended to every key in web-storage backends
    pub key_prefix: String,
    /// File backing the `local` storage area
    pub local_path: PathBuf,
    /// Total producer calls per load before giving up
    pub retry_attempts: u32,
    /// Base delay in milliseconds for linear backoff
    pub retry_delay_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_MS` - Entry TTL in milliseconds (default: 300000)
    /// - `CACHE_MAX_SIZE` - Maximum memory entries (default: 100)
    /// - `CACHE_STORAGE` - `memory`, `session` or `local` (default: memory)
    /// - `CACHE_KEY_PREFIX` - Key namespace (default: `cache_`)
    /// - `CACHE_LOCAL_PATH` - Local storage file (default: `perf_cache_local.json`)
    /// - `RETRY_ATTEMPTS` - Producer calls per load (default: 3)
    /// - `RETRY_DELAY_MS` - Backoff base delay (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_ms: parse_var("CACHE_TTL_MS").unwrap_or(defaults.ttl_ms),
            max_size: parse_var("CACHE_MAX_SIZE").unwrap_or(defaults.max_size),
            storage: parse_var("CACHE_STORAGE").unwrap_or(defaults.storage),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            local_path: env::var("CACHE_LOCAL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_path),
            retry_attempts: parse_var("RETRY_ATTEMPTS").unwrap_or(defaults.retry_attempts),
            retry_delay_ms: parse_var("RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl_ms: 5 * 60 * 1000,
            max_size: 100,
            storage: StorageKind::Memory,
            key_prefix: "cache_".to_string(),
            local_path: PathBuf::from("perf_cache_local.json"),
            retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.ttl_ms, 300_000);
        assert_eq!(config.max_size, 100);
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.key_prefix, "cache_");
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment so parallel tests don't race
        env::remove_var("CACHE_TTL_MS");
        env::remove_var("CACHE_MAX_SIZE");
        env::remove_var("CACHE_KEY_PREFIX");
        env::set_var("CACHE_STORAGE", "not-a-backend");
        env::set_var("RETRY_ATTEMPTS", "5");

        let config = Config::from_env();
        assert_eq!(config.ttl_ms, 300_000);
        assert_eq!(config.max_size, 100);
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.key_prefix, "cache_");
        assert_eq!(config.retry_attempts, 5);

        env::set_var("CACHE_STORAGE", "session");
        assert_eq!(Config::from_env().storage, StorageKind::Session);

        env::remove_var("CACHE_STORAGE");
        env::remove_var("RETRY_ATTEMPTS");
    }
}
