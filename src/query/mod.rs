//! Query Module
//!
//! Async handles that put a cache in front of a producer: retry with linear
//! backoff, observable state, and optional sharing of in-flight loads.

mod api_memo;
mod cached_api;
mod cached_computation;
mod retry;
mod state;

pub use api_memo::ApiMemo;
pub use cached_api::CachedApi;
pub use cached_computation::CachedComputation;
pub use retry::{retry_with_backoff, RetryPolicy, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use state::QueryState;
