//! Cache Context
//!
//! Explicitly constructed set of storage areas and caches handed to the
//! code that needs them, instead of process-wide cache globals.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cache::{
    AdvancedCache, Backend, CacheOptions, LocalStorage, SessionStorage, SharedCache, StorageArea,
    StorageKind,
};
use crate::config::Config;
use crate::error::Result;
use crate::query::{ApiMemo, RetryPolicy};

/// Storage areas, the shared API cache and the settings used to build more caches.
#[derive(Clone)]
pub struct CacheContext {
    config: Config,
    session: SessionStorage,
    /// Opened only when the configured backend is `local`
    local: Option<LocalStorage>,
    /// Cache for raw API responses
    pub api: SharedCache<Value>,
}

impl CacheContext {
    /// Builds the context, opening the local storage file if configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let local = match config.storage {
            StorageKind::Local => Some(LocalStorage::open(&config.local_path)?),
            StorageKind::Memory | StorageKind::Session => None,
        };
        let session = SessionStorage::new();
        let api = AdvancedCache::new(options_for(
            config,
            backend_for(config.storage, &session, local.as_ref()),
            "api_",
        ))
        .into_shared();
        info!(storage = %config.storage, "Cache context initialized");

        Ok(Self {
            config: config.clone(),
            session,
            local,
            api,
        })
    }

    /// Backend for the configured storage kind.
    pub fn backend(&self) -> Backend {
        backend_for(self.config.storage, &self.session, self.local.as_ref())
    }

    /// Options from config, with `namespace` appended to the key prefix so
    /// caches sharing a storage area do not collide.
    pub fn cache_options<T>(&self, namespace: &str) -> CacheOptions<T>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        options_for(&self.config, self.backend(), namespace)
    }

    pub fn build_cache<T>(&self, namespace: &str) -> SharedCache<T>
    where
        T: Serialize + DeserializeOwned + Clone + 'static,
    {
        AdvancedCache::new(self.cache_options(namespace)).into_shared()
    }

    pub fn api_memo<T>(&self, namespace: &str) -> ApiMemo<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        ApiMemo::new(self.build_cache(namespace), self.retry_policy())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session_area(&self) -> Arc<dyn StorageArea> {
        Arc::new(self.session.clone())
    }
}

fn backend_for(
    kind: StorageKind,
    session: &SessionStorage,
    local: Option<&LocalStorage>,
) -> Backend {
    match (kind, local) {
        (StorageKind::Session, _) => Backend::Session(Arc::new(session.clone())),
        (StorageKind::Local, Some(local)) => Backend::Local(Arc::new(local.clone())),
        _ => Backend::Memory,
    }
}

fn options_for<T>(config: &Config, backend: Backend, namespace: &str) -> CacheOptions<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    CacheOptions::new()
        .ttl(config.ttl())
        .max_size(config.max_size)
        .backend(backend)
        .key_prefix(format!("{}{}", config.key_prefix, namespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        let config = Config::default();
        let first = CacheContext::from_config(&config).unwrap();
        let second = CacheContext::from_config(&config).unwrap();

        first.api.write().await.set("courses", serde_json::json!([1, 2]));

        assert!(first.api.write().await.has("courses"));
        assert!(!second.api.write().await.has("courses"));
    }

    #[tokio::test]
    async fn test_session_caches_are_namespaced() {
        let config = Config {
            storage: StorageKind::Session,
            ..Config::default()
        };
        let context = CacheContext::from_config(&config).unwrap();
        let lessons = context.build_cache::<u32>("lessons_");

        lessons.write().await.set("1", 10);
        context.api.write().await.clear();

        assert_eq!(lessons.write().await.get("1"), Some(10));
        let keys = context.session_area().keys().unwrap();
        assert_eq!(keys, vec!["cache_lessons_1".to_string()]);
    }

    #[test]
    fn test_local_backend_opens_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: StorageKind::Local,
            local_path: dir.path().join("local.json"),
            ..Config::default()
        };
        let context = CacheContext::from_config(&config).unwrap();

        assert_eq!(context.backend().kind(), StorageKind::Local);
        assert_eq!(context.retry_policy(), RetryPolicy::from_config(&config));
    }
}
