//! Durable client storage for session state (auth marker, active scope).
//!
//! Writes are synchronous: a call returns only after the value is durable, so
//! a reload observes exactly what was acknowledged.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage key of the persisted auth marker.
pub const MARKER_KEY: &str = "auth_marker";
/// Storage key of the persisted branch scope.
pub const SCOPE_KEY: &str = "active_branch";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("stored value for '{key}' is corrupted: {message}")]
    Corrupted { key: String, message: String },

    #[error("value for '{key}' could not be encoded: {message}")]
    Encode { key: String, message: String },
}

/// String key/value store owned by one session.
pub trait SessionStorage: Send + Sync + core::fmt::Debug {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Load and decode a JSON value.
pub fn load_json<T: DeserializeOwned>(
    storage: &dyn SessionStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.load(key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupted {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

/// Encode and save a JSON value.
pub fn save_json<T: Serialize>(
    storage: &dyn SessionStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    storage.save(key, &raw)
}

/// Process-memory storage (tests, and sessions without a storage directory).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a directory.
///
/// Files are written to a temporary sibling, synced, then renamed over the
/// target, so a crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.to_string_lossy().into_owned(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn io_err(key: &str) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        key: key.to_string(),
        source,
    }
}

impl SessionStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(StorageError::Corrupted {
                key: key.to_string(),
                message: e.to_string(),
            }),
            Err(e) => Err(io_err(key)(e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let target = self.path(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));

        let mut file = fs::File::create(&tmp).map_err(io_err(key))?;
        file.write_all(value.as_bytes()).map_err(io_err(key))?;
        file.sync_all().map_err(io_err(key))?;
        fs::rename(&tmp, &target).map_err(io_err(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(key)(e)),
        }
    }
}
