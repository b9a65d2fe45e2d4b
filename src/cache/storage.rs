//! Durable string-keyed storage backends.
//!
//! Resolution state is persisted as a handful of JSON strings under fixed
//! keys. [`FileStorage`] keeps one `<key>.json` file per key, [`MemoryStorage`]
//! keeps them in a map (nothing survives the process).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Persistence failure. Logged by callers, never fatal.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at `{0}`")]
    Io(PathBuf, #[source] io::Error),

    #[error("stored value is malformed")]
    Json(#[from] serde_json::Error),
}

/// String-keyed durable storage.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// FileStorage
// ============================================================================

/// One JSON file per key inside a directory (created on first write).
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

/// Check if file content is the same as new content
fn file_content_matches(path: &Path, content: &str) -> bool {
    path.exists() && fs::read_to_string(path).is_ok_and(|existing| existing == content)
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(path, err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if file_content_matches(&path, value) {
            return Ok(());
        }

        fs::create_dir_all(&self.dir).map_err(|err| StorageError::Io(self.dir.clone(), err))?;
        fs::write(&path, value).map_err(|err| StorageError::Io(path, err))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(path, err)),
        }
    }
}

// ============================================================================
// MemoryStorage
// ============================================================================

/// Process-local storage, used when persistence is disabled.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<FxHashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
