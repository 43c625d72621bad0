//! String-keyed storage areas.
//!
//! A storage area behaves like a browser `Storage`: string keys, string
//! values, missing keys read as `None`. Two scopes exist: a persistent area
//! that survives restarts and a session area that lives as long as the
//! process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Storage file name in the cache directory
pub const STORAGE_FILE: &str = "storage.json";

pub trait StorageArea: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    /// Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Session-scoped area, dropped with the process.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StorageArea for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items().remove(key);
        Ok(())
    }
}

/// Persistent area backed by a single JSON object file.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Open the storage file inside `dir`. The file is created on first write.
    pub fn new(dir: &Path) -> Self {
        Self::at(dir.join(STORAGE_FILE))
    }

    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read storage file {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).context("Failed to parse storage file")
    }

    /// Current contents for a mutation. An unreadable file is replaced
    /// wholesale by the next write.
    fn read_for_update(&self) -> BTreeMap<String, String> {
        self.read_all().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Resetting unreadable storage file");
            BTreeMap::new()
        })
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write storage file {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace storage file {}", self.path.display()))?;
        Ok(())
    }
}

impl StorageArea for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut items = self.read_for_update();
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)?;
        debug!(key, path = %self.path.display(), "Storage item written");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut items = match self.read_all() {
            Ok(items) => items,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Resetting unreadable storage file");
                self.write_all(&BTreeMap::new())?;
                return Ok(());
            }
        };
        if items.remove(key).is_some() {
            self.write_all(&items)?;
            debug!(key, path = %self.path.display(), "Storage item removed");
        }
        Ok(())
    }
}
