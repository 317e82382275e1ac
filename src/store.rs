//! Base URL resolution and persistence.
//!
//! The persisted slot is a single string under one key. [`FileStore`] keeps it in
//! a small JSON object on disk; [`MemoryStore`] is used when nothing should
//! outlive the process.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;

#[cfg(test)]
use mockall::automock;

/// String key-value persistence boundary.
#[cfg_attr(test, automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// JSON-object file on disk. The whole file is rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            _ => {
                tracing::warn!(
                    "Storage file {} is not a JSON object - starting empty",
                    self.path.display()
                );
                Ok(Map::new())
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let map = self.read_map()?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// Trim, then drop trailing slashes. Whitespace exposed by the slash strip goes too,
/// so the result is a fixed point.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace())
        .to_string()
}

/// Resolves and persists the backend base URL.
pub struct BaseUrlStore {
    store: Box<dyn KeyValueStore>,
    key: String,
    default_base_url: String,
}

impl BaseUrlStore {
    pub fn new(
        store: Box<dyn KeyValueStore>,
        key: impl Into<String>,
        default_base_url: &str,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            default_base_url: normalize_base_url(default_base_url),
        }
    }

    pub fn default_base_url(&self) -> &str {
        &self.default_base_url
    }

    /// Normalized base URL, or the default when the input is missing or normalizes
    /// to nothing. The default itself may be empty.
    pub fn resolve(&self, raw: Option<&str>) -> String {
        let normalized = normalize_base_url(raw.unwrap_or_default());
        if normalized.is_empty() {
            self.default_base_url.clone()
        } else {
            normalized
        }
    }

    pub fn load(&self) -> Option<String> {
        match self.store.get(&self.key) {
            Ok(Some(value)) if !value.trim().is_empty() => Some(value),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Failed to read persisted base URL: {}", e);
                None
            }
        }
    }

    /// Persist the normalized value, or forget it when that is empty.
    pub fn save(&self, raw: &str) -> Result<()> {
        let normalized = normalize_base_url(raw);
        if normalized.is_empty() {
            tracing::debug!("Clearing persisted base URL");
            self.store.remove(&self.key)
        } else {
            tracing::debug!("Persisting base URL {}", normalized);
            self.store.set(&self.key, &normalized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store(default: &str) -> BaseUrlStore {
        BaseUrlStore::new(Box::new(MemoryStore::new()), "apiBaseUrl", default)
    }

    #[test]
    fn test_resolve_empty_and_missing_give_default() {
        let store = memory_store("http://127.0.0.1:8000");
        assert_eq!(store.resolve(Some("")), "http://127.0.0.1:8000");
        assert_eq!(store.resolve(Some("   ")), "http://127.0.0.1:8000");
        assert_eq!(store.resolve(None), "http://127.0.0.1:8000");
    }

    #[test]
    fn test_resolve_default_may_be_unset() {
        let store = memory_store("");
        assert_eq!(store.resolve(None), "");
    }

    #[test]
    fn test_resolve_strips_trailing_slashes() {
        let store = memory_store("");
        assert_eq!(store.resolve(Some("https://x.test///")), "https://x.test");
        assert_eq!(store.resolve(Some("  https://x.test/api/ ")), "https://x.test/api");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let store = memory_store("https://default.test/");
        for raw in [
            "",
            "https://x.test///",
            "https://x.test/ /",
            " https://x.test",
            "///",
            "https://default.test",
        ] {
            let once = store.resolve(Some(raw));
            assert_eq!(store.resolve(Some(&once)), once, "input {raw:?}");
        }
        assert_eq!(store.default_base_url(), "https://default.test");
    }

    #[test]
    fn test_save_then_load_normalized() {
        let store = memory_store("");
        store.save(" https://x.test// ").unwrap();
        assert_eq!(store.load().as_deref(), Some("https://x.test"));
    }

    #[test]
    fn test_save_empty_clears_previous_value() {
        let store = memory_store("");
        store.save("https://x.test").unwrap();
        store.save("  ").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_save_empty_removes_key_without_writing() {
        let mut kv = MockKeyValueStore::new();
        kv.expect_remove()
            .withf(|key| key == "apiBaseUrl")
            .times(1)
            .returning(|_| Ok(()));
        kv.expect_set().never();

        let store = BaseUrlStore::new(Box::new(kv), "apiBaseUrl", "");
        store.save("/").unwrap();
    }

    #[test]
    fn test_load_swallows_backend_errors() {
        let mut kv = MockKeyValueStore::new();
        kv.expect_get()
            .returning(|_| Err(crate::error::ClientError::validation("disk gone")));

        let store = BaseUrlStore::new(Box::new(kv), "apiBaseUrl", "");
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let first = FileStore::new(&path);
        first.set("apiBaseUrl", "https://x.test").unwrap();
        first.set("other", "kept").unwrap();

        let second = FileStore::new(&path);
        assert_eq!(second.get("apiBaseUrl").unwrap().as_deref(), Some("https://x.test"));

        second.remove("apiBaseUrl").unwrap();
        assert_eq!(FileStore::new(&path).get("apiBaseUrl").unwrap(), None);
        assert_eq!(FileStore::new(&path).get("other").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get("apiBaseUrl").unwrap(), None);
        store.remove("apiBaseUrl").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{not json").unwrap();
        assert!(FileStore::new(&path).get("apiBaseUrl").is_err());
    }
}
