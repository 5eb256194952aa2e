//! Error types for the cache library
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for caches, storage areas and query handles.
///
/// `Clone` so a single failure can be handed to every waiter of a shared
/// in-flight load and published as query state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Storage area rejected a read or write (quota, I/O, disabled)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Producer kept failing after every retry attempt
    #[error("Load failed for '{key}' after {attempts} attempt(s): {message}")]
    Load {
        key: String,
        attempts: u32,
        message: String,
    },
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Storage(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache library.
pub type Result<T> = std::result::Result<T, CacheError>;
