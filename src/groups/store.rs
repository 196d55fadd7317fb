//! Key-value persistence for resource groups

use crate::error::{ReconError, Result};
use anyhow::Context;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Minimal persistence the group registry depends on
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;
}

/// All keys in one JSON object on disk.
///
/// Every write rewrites the whole document through a temporary file and a
/// rename, so readers never observe a half-written file. Two processes
/// writing at once can still overwrite each other.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> anyhow::Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt store file {:?}", self.path))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("Store file {:?} is not a JSON object", self.path),
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).with_context(|| format!("Failed to write {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;

        tracing::debug!("Wrote {} keys to {:?}", document.len(), self.path);
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut document = self.read_document().map_err(ReconError::persistence)?;
        Ok(document.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut document = self.read_document().map_err(ReconError::persistence)?;
        document.insert(key.to_string(), value);
        self.write_document(&document)
            .map_err(ReconError::persistence)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut document = self.read_document().map_err(ReconError::persistence)?;
        if document.remove(key).is_some() {
            self.write_document(&document)
                .map_err(ReconError::persistence)?;
        }
        Ok(())
    }
}

/// In-memory store, mostly for tests
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.values.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(ReconError::persistence("store is read-only"));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.check_writable()?;
        self.values().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.values().remove(key);
        Ok(())
    }
}
