//! Timing Module
//!
//! Debounce and throttle wrappers driven by the tokio timer.

mod debounce;
mod throttle;

pub use debounce::{debounce, Debounced};
pub use throttle::{throttle, Throttled};
