//! Directory-backed key-value store.

use std::path::{Path, PathBuf};

use mittens_core::repository::KeyValueStore;
use mittens_core::{MittensError, Result};

use super::atomic_file::{AtomicFile, AtomicFileError};

/// Stores each key as `<dir>/<key>.json`, replaced atomically on write.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> Result<AtomicFile> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(MittensError::storage(format!("Invalid storage key '{key}'")));
        }
        Ok(AtomicFile::new(self.dir.join(format!("{key}.json"))))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.file_for(key)?.read().map_err(to_storage_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.file_for(key)?.write(value).map_err(to_storage_error)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.file_for(key)?.remove().map_err(to_storage_error)
    }
}

fn to_storage_error(err: AtomicFileError) -> MittensError {
    MittensError::storage(err.to_string())
}
