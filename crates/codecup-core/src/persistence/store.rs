use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::CodecupError;

/// Durable string key-value store shared by every tab session.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CodecupError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CodecupError>;

    fn remove(&self, key: &str) -> Result<(), CodecupError>;
}

/// Process-local store; contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, CodecupError> {
        self.entries
            .lock()
            .map_err(|_| CodecupError::Store("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CodecupError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CodecupError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CodecupError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a base directory. Writes go through a
/// temporary file and a rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn with_dir(base_dir: impl Into<PathBuf>) -> Result<Self, CodecupError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| {
            CodecupError::Store(format!(
                "Failed to create state directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Bytes outside `[A-Za-z0-9_-]` are written as `%XX`, so distinct keys
    /// always map to distinct files.
    fn entry_path(&self, key: &str) -> PathBuf {
        let mut file = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                file.push(byte as char);
            } else {
                file.push_str(&format!("%{:02X}", byte));
            }
        }
        self.base_dir.join(format!("{}.json", file))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CodecupError> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| CodecupError::Store(format!("Failed to read {}: {}", path.display(), e)))?;
        Ok(Some(contents))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CodecupError> {
        let path = self.entry_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(|e| {
            CodecupError::Store(format!("Failed to write temporary file: {}", e))
        })?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| CodecupError::Store(format!("Failed to rename state file: {}", e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CodecupError> {
        let path = self.entry_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                CodecupError::Store(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("a").unwrap().is_none());
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        FileStore::with_dir(dir.path()).unwrap().set("codecup_tabs", "{}").unwrap();

        let reopened = FileStore::with_dir(dir.path()).unwrap();
        assert_eq!(reopened.get("codecup_tabs").unwrap().as_deref(), Some("{}"));
        assert!(!dir.path().join("codecup_tabs.json.tmp").exists());
    }

    #[test]
    fn test_file_store_escapes_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::with_dir(dir.path()).unwrap();
        store.set("selected_task_../../etc", "x").unwrap();
        assert!(dir
            .path()
            .join("selected_task_%2E%2E%2F%2E%2E%2Fetc.json")
            .exists());
        store.remove("selected_task_../../etc").unwrap();
        assert!(store.get("selected_task_../../etc").unwrap().is_none());
    }

    #[test]
    fn test_file_store_keys_differing_in_punctuation_stay_apart() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::with_dir(dir.path()).unwrap();
        store.set("tab.1", "dot").unwrap();
        store.set("tab_1", "underscore").unwrap();
        store.set("tab%2E1", "literal").unwrap();

        assert_eq!(store.get("tab.1").unwrap().as_deref(), Some("dot"));
        assert_eq!(store.get("tab_1").unwrap().as_deref(), Some("underscore"));
        assert_eq!(store.get("tab%2E1").unwrap().as_deref(), Some("literal"));

        store.remove("tab_1").unwrap();
        assert_eq!(store.get("tab.1").unwrap().as_deref(), Some("dot"));
    }
}
