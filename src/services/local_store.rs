// Local State Store
// File-backed key-value map for history, theme and session state.
// Owned by the caller and passed to whatever needs it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No data directory available on this platform")]
    NoDataDir,
}

impl StoreError {
    /// Adapter for `map_err` that remembers which path failed.
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(io::Error) -> StoreError {
        let path = path.as_ref().to_path_buf();
        move |source| StoreError::Io { path, source }
    }
}

pub struct LocalStore {
    path: PathBuf,
    // Serializes load-modify-save cycles within the process.
    lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// `state.json` under the platform data directory.
    pub fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::data_local_dir().ok_or(StoreError::NoDataDir)?;
        Ok(Self::new(dir.join("veritas").join("state.json")))
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// An unreadable file is moved aside and the store starts empty.
    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path).map_err(StoreError::io(&self.path))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                let aside = self.corrupt_path();
                warn!(
                    "[STORE] state file unreadable ({}), moving it to {}",
                    e,
                    aside.display()
                );
                fs::rename(&self.path, &aside).map_err(StoreError::io(&aside))?;
                Ok(Map::new())
            }
        }
    }

    fn corrupt_path(&self) -> PathBuf {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "state.json".to_string());
        self.path.with_file_name(format!("{}.{}.bak", name, timestamp))
    }

    /// Write to a sibling temp file, then rename over the target.
    fn save(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
        }
        let content = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, content).map_err(StoreError::io(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::io(&self.path)(e)
        })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let _guard = self.guard();
        let map = self.load()?;
        match map.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let _guard = self.guard();
        let mut map = self.load()?;
        map.insert(key.to_string(), serde_json::to_value(value)?);
        self.save(&map)
    }

    /// Read, modify and write one key under the store lock.
    ///
    /// `f` sees `None` when the key is absent or its value no longer fits `T`
    /// (logged). Leaving `None` behind removes the key.
    pub fn update<T, R, F>(&self, key: &str, f: F) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Option<T>) -> R,
    {
        let _guard = self.guard();
        let mut map = self.load()?;

        let mut value: Option<T> = match map.remove(key) {
            Some(raw) => match serde_json::from_value(raw) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("[STORE] replacing unreadable value for {}: {}", key, e);
                    None
                }
            },
            None => None,
        };

        let out = f(&mut value);

        if let Some(v) = value {
            map.insert(key.to_string(), serde_json::to_value(&v)?);
        }
        self.save(&map)?;
        Ok(out)
    }

    /// Returns whether the key was present.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let _guard = self.guard();
        let mut map = self.load()?;
        let removed = map.remove(key).is_some();
        if removed {
            self.save(&map)?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.guard();
        self.save(&Map::new())
    }
}
