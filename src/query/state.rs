//! Observable state of a query handle.

use serde::Serialize;

use crate::error::CacheError;

// == Query State ==
/// What a consumer renders from: the data, whether a load is running, and
/// the last load error. Errors live here instead of being returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<CacheError>,
    /// Whether `data` came from the cache rather than a fresh load
    pub is_from_cache: bool,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            is_from_cache: false,
        }
    }
}

impl<T> QueryState<T> {
    pub(crate) fn cached(value: T) -> Self {
        Self {
            data: Some(value),
            is_loading: false,
            error: None,
            is_from_cache: true,
        }
    }

    pub(crate) fn loaded(value: T) -> Self {
        Self {
            data: Some(value),
            is_loading: false,
            error: None,
            is_from_cache: false,
        }
    }

    pub(crate) fn failed(err: CacheError) -> Self {
        Self {
            data: None,
            is_loading: false,
            error: Some(err),
            is_from_cache: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }
}

fn serialize_error<S>(error: &Option<CacheError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_error_message() {
        let state: QueryState<u32> =
            QueryState::failed(CacheError::Storage("disabled".to_string()));
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["error"], "Storage error: disabled");
        assert_eq!(json["data"], serde_json::Value::Null);
        assert!(!state.is_success());
    }
}
