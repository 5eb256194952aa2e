//! Perf Cache - client-side caching and rate-limiting utilities
//!
//! Provides an LRU map, a TTL cache over memory or storage areas,
//! memoization, debounce/throttle, and retrying query handles.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod memo;
pub mod query;
pub mod timing;

pub use cache::{AdvancedCache, CacheOptions, LruCache, SharedCache};
pub use config::Config;
pub use context::CacheContext;
pub use error::{CacheError, Result};
