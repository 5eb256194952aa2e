//! Codec Module
//!
//! Typed encode/decode boundary for entries persisted into a storage area.

use std::fmt::Debug;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::CacheEntry;
use crate::error::Result;

/// Serializer pair owned by a cache instance.
pub trait Codec<T>: Send + Sync + Debug {
    fn encode(&self, entry: &CacheEntry<T>) -> Result<String>;
    fn decode(&self, raw: &str) -> Result<CacheEntry<T>>;
}

// == JSON Codec ==
/// Default codec: the entry as a JSON object.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, entry: &CacheEntry<T>) -> Result<String> {
        Ok(serde_json::to_string(entry)?)
    }

    fn decode(&self, raw: &str) -> Result<CacheEntry<T>> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Course {
        id: u32,
        title: String,
    }

    #[test]
    fn test_json_codec_decodes_persisted_layout() {
        let codec = JsonCodec::<Course>::new();
        let raw =
            r#"{"value":{"id":7,"title":"Rust"},"timestamp":1,"lastAccessed":2,"accessCount":3}"#;

        let entry = codec.decode(raw).unwrap();
        assert_eq!(entry.value.title, "Rust");
        assert_eq!(entry.last_accessed, 2);
        assert_eq!(entry.access_count, 3);
    }

    #[test]
    fn test_json_codec_rejects_wrong_shape() {
        let codec = JsonCodec::<Course>::new();
        let raw = r#"{"value":{"id":"seven"},"timestamp":1,"lastAccessed":2,"accessCount":3}"#;

        assert!(matches!(codec.decode(raw), Err(CacheError::Serialization(_))));
        assert!(matches!(codec.decode("not json"), Err(CacheError::Serialization(_))));
    }
}
