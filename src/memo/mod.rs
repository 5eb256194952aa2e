//! Memoization Module
//!
//! Argument-keyed memoization, dependency-guarded recomputation and the
//! comparison helpers both rely on.

mod guard;
mod memoize;
mod shallow;
mod stable;

pub use guard::MemoGuard;
pub use memoize::{memoize, memoize_with_key, Memoized, DEFAULT_MEMO_SIZE};
pub use shallow::{deps_changed, shallow_equal, ByRef};
pub use stable::StableCallback;
