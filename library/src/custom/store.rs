//! Durable key-value storage for custom node definitions.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use log::{debug, info};

use crate::error::GraphError;

/// Storage key the custom node collection lives under.
pub const CUSTOM_NODES_KEY: &str = "nodegraph.custom_nodes";

/// Flat string-to-string durable storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, GraphError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), GraphError>;
    fn remove(&mut self, key: &str) -> Result<(), GraphError>;
}

/// Non-persistent store for tests and scratch sessions.
#[derive(Default)]
pub struct InMemoryStore {
    entries: HashMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, GraphError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), GraphError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), GraphError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON document on disk. Every write flushes the
/// whole document.
pub struct JsonFileStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file reads as an empty store and
    /// is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, GraphError> {
        let path = path.into();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            HashMap::new()
        };
        debug!(
            "JsonFileStore: opened '{}' with {} entry(ies)",
            path.display(),
            entries.len()
        );
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn flush(&self) -> Result<(), GraphError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, GraphError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), GraphError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()?;
        info!("JsonFileStore: saved '{}' to {}", key, self.path.display());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), GraphError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
            info!("JsonFileStore: removed '{}' from {}", key, self.path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_in_memory_store_round_trip() {
        let mut store = InMemoryStore::new();
        assert_eq!(store.get("k").expect("get"), None);

        store.set("k", "v").expect("set");
        assert_eq!(store.get("k").expect("get"), Some("v".to_string()));

        store.remove("k").expect("remove");
        assert_eq!(store.get("k").expect("get"), None);
    }

    #[test]
    fn test_json_file_store_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!("kv_store_test_{}.json", Uuid::new_v4()));

        {
            let mut store = JsonFileStore::open(&path).expect("open");
            store.set("alpha", "1").expect("set");
            store.set("beta", "2").expect("set");
            store.remove("alpha").expect("remove");
        }

        let store = JsonFileStore::open(&path).expect("reopen");
        assert_eq!(store.get("alpha").expect("get"), None);
        assert_eq!(store.get("beta").expect("get"), Some("2".to_string()));

        std::fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let path = std::env::temp_dir().join(format!("kv_store_missing_{}.json", Uuid::new_v4()));
        let store = JsonFileStore::open(&path).expect("open");
        assert_eq!(store.get("anything").expect("get"), None);
        assert!(!path.exists());
    }
}
