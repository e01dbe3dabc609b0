//! Persistent preference storage.
//!
//! The locale preference is process-wide state that outlives a session, so it
//! is reached through the [`PreferenceStore`] trait and injected into the
//! state manager instead of being read from a global.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access preference file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key-value storage for user preferences.
pub trait PreferenceStore: Send + Sync {
    /// Read `key`, returning `default` if it has never been written.
    fn get(&self, key: &str, default: &str) -> String;

    /// Write `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store. Lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `key = value`.
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str, default: &str) -> String {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object on disk, e.g. `{ "locale": "fr" }`.
///
/// The file is read on every `get` and rewritten on every `set`, so several
/// stores pointed at the same path see each other's writes.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!(
                    "Preference file {} is not a JSON object, ignoring its contents",
                    self.path.display()
                );
                Ok(Map::new())
            }
        }
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str, default: &str) -> String {
        let map = match self.read_all() {
            Ok(map) => map,
            Err(e) => {
                warn!("{}", e);
                return default.to_string();
            }
        };

        match map.get(key) {
            Some(Value::String(value)) => value.clone(),
            Some(other) => {
                warn!("Preference '{}' has non-string value {}, using default", key, other);
                default.to_string()
            }
            None => default.to_string(),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut map = self.read_all()?;
        map.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // ==================== MemoryStore Tests ====================

    #[test]
    fn test_memory_store_returns_default_when_unset() {
        let store = MemoryStore::new();
        assert_eq!(store.get("locale", "en"), "en");
    }

    #[test]
    fn test_memory_store_set_then_get() {
        let store = MemoryStore::new();
        store.set("locale", "fr").unwrap();
        assert_eq!(store.get("locale", "en"), "fr");
    }

    #[test]
    fn test_memory_store_with_value() {
        let store = MemoryStore::with_value("locale", "ja");
        assert_eq!(store.get("locale", "en"), "ja");
        assert_eq!(store.get("theme", "dark"), "dark");
    }

    // ==================== JsonFileStore Tests ====================

    #[test]
    fn test_file_store_missing_file_returns_default() {
        let dir = tempdir().expect("failed to create temp dir");
        let store = JsonFileStore::new(dir.path().join("prefs.json"));

        assert_eq!(store.get("locale", "en"), "en");
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("nested").join("prefs.json");

        JsonFileStore::new(&path).set("locale", "pt-BR").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("locale", "en"), "pt-BR");
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{ "theme": "dark" }"#).unwrap();

        let store = JsonFileStore::new(&path);
        store.set("locale", "de").unwrap();

        assert_eq!(store.get("theme", "light"), "dark");
        assert_eq!(store.get("locale", "en"), "de");
    }

    #[test]
    fn test_file_store_corrupt_file_returns_default() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not = json").unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("locale", "en"), "en");

        store.set("locale", "sv").unwrap();
        assert_eq!(store.get("locale", "en"), "sv");
    }

    #[test]
    fn test_file_store_non_string_value_returns_default() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{ "locale": 42 }"#).unwrap();

        assert_eq!(JsonFileStore::new(&path).get("locale", "en"), "en");
    }
}
