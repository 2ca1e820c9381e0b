//! Key-value persistence the chat state is written through.
//!
//! Each key holds one JSON value. Reads never fail: a missing or unreadable
//! value is reported as `None` and callers fall back to their defaults.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait LocalStorage {
    fn load(&self, key: &str) -> Option<Value>;
    fn save(&self, key: &str, value: &Value) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl LocalStorage for FileStorage {
    fn load(&self, key: &str) -> Option<Value> {
        let raw = fs::read_to_string(self.path_for(key)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating data directory {}", self.dir.display()))?;

        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!(".{key}.json.tmp"));
        let body = serde_json::to_string_pretty(value)?;
        fs::write(&tmp_path, body).with_context(|| format!("writing {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: Value) -> Self {
        let storage = Self::new();
        if let Ok(mut values) = storage.values.lock() {
            values.insert(key.to_string(), value);
        }
        storage
    }
}

impl LocalStorage for MemoryStorage {
    fn load(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))?;
        values.insert(key.to_string(), value.clone());
        Ok(())
    }
}

impl<T: LocalStorage + ?Sized> LocalStorage for &T {
    fn load(&self, key: &str) -> Option<Value> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        (**self).save(key, value)
    }
}

impl<T: LocalStorage + ?Sized> LocalStorage for std::sync::Arc<T> {
    fn load(&self, key: &str) -> Option<Value> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        (**self).save(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_round_trip_creates_directory() {
        let temp = TempDir::new().expect("temp dir");
        let storage = FileStorage::new(temp.path().join("nested").join("data"));

        storage.save("chats", &json!([{ "id": 1 }])).expect("save");
        assert_eq!(storage.load("chats"), Some(json!([{ "id": 1 }])));
        assert!(storage.dir().join("chats.json").exists());
    }

    #[test]
    fn test_file_storage_missing_or_corrupt_reads_none() {
        let temp = TempDir::new().expect("temp dir");
        let storage = FileStorage::new(temp.path());

        assert_eq!(storage.load("chats"), None);
        fs::write(temp.path().join("chats.json"), "{not json").expect("seed corrupt file");
        assert_eq!(storage.load("chats"), None);
    }

    #[test]
    fn test_memory_storage_overwrites_key() {
        let storage = MemoryStorage::with_value("settings", json!({ "apiUrl": "a" }));
        storage.save("settings", &json!({ "apiUrl": "b" })).expect("save");
        assert_eq!(storage.load("settings"), Some(json!({ "apiUrl": "b" })));
        assert_eq!(storage.load("chats"), None);
    }
}
