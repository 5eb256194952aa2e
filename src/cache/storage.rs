//! Storage Module
//!
//! String key/value storage areas that caches can persist entries into.
//! `SessionStorage` lives as long as the process; `LocalStorage` is backed by
//! a JSON file and survives restarts.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CacheError, Result};

// == Storage Kind ==
/// Backend selector used by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Session,
    Local,
}

impl FromStr for StorageKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "session" => Ok(StorageKind::Session),
            "local" => Ok(StorageKind::Local),
            other => Err(CacheError::Storage(format!("unknown storage kind: {other}"))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::Memory => "memory",
            StorageKind::Session => "session",
            StorageKind::Local => "local",
        };
        f.write_str(name)
    }
}

// == Storage Area ==
/// Shared, synchronous string store. Every call may fail.
pub trait StorageArea: Send + Sync + Debug {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
    /// Every key in the area, including ones written by other owners.
    fn keys(&self) -> Result<Vec<String>>;
}

// == Session Storage ==
/// Process-scoped area. Clones share the same items.
#[derive(Debug, Clone, Default)]
pub struct SessionStorage {
    items: Arc<Mutex<BTreeMap<String, String>>>,
    /// Byte budget over all keys and values, None = unlimited
    quota_bytes: Option<usize>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an area that rejects writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Arc::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| CacheError::Storage("session storage lock poisoned".to_string()))
    }
}

impl StorageArea for SessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.lock()?;
        if let Some(quota) = self.quota_bytes {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(CacheError::Storage(format!(
                    "quota of {quota} bytes exceeded writing '{key}'"
                )));
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

// == Local Storage ==
/// File-backed area. Every write rewrites the whole file.
#[derive(Clone)]
pub struct LocalStorage {
    path: PathBuf,
    items: Arc<Mutex<BTreeMap<String, String>>>,
}

impl LocalStorage {
    /// Opens the area at `path`, loading existing items if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), items = items.len(), "Opened local storage");

        Ok(Self {
            path,
            items: Arc::new(Mutex::new(items)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| CacheError::Storage("local storage lock poisoned".to_string()))
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(items)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Debug for LocalStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorage")
            .field("path", &self.path)
            .finish()
    }
}

impl StorageArea for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.lock()?;
        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist(&items) {
            // Keep memory and disk in agreement
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.lock()?;
        if let Some(old) = items.remove(key) {
            if let Err(err) = self.persist(&items) {
                items.insert(key.to_string(), old);
                return Err(err);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

// == Backend ==
/// Where an `AdvancedCache` keeps its entries.
#[derive(Debug, Clone, Default)]
pub enum Backend {
    /// In-process map owned by the cache
    #[default]
    Memory,
    Session(Arc<dyn StorageArea>),
    Local(Arc<dyn StorageArea>),
}

impl Backend {
    pub fn kind(&self) -> StorageKind {
        match self {
            Backend::Memory => StorageKind::Memory,
            Backend::Session(_) => StorageKind::Session,
            Backend::Local(_) => StorageKind::Local,
        }
    }

    pub fn area(&self) -> Option<&Arc<dyn StorageArea>> {
        match self {
            Backend::Memory => None,
            Backend::Session(area) | Backend::Local(area) => Some(area),
        }
    }
}
