//! Atomic text-file operations.
//!
//! Provides a thin layer for safe access to small value files.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors that can occur during atomic file operations.
#[derive(Error, Debug)]
pub enum AtomicFileError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to lock {}: {source}", .path.display())]
    Lock { path: PathBuf, source: io::Error },
    #[error("Not a file path: {}", .0.display())]
    InvalidPath(PathBuf),
}

impl AtomicFileError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| AtomicFileError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A handle to a text file that is replaced atomically.
///
/// Provides:
/// - **Atomicity**: writes go to a tmp file and are renamed into place
/// - **Isolation**: writers and removers hold an exclusive lock
/// - **Durability**: explicit fsync before rename
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file.
    ///
    /// - `Ok(Some(content))`: file exists
    /// - `Ok(None)`: file doesn't exist
    pub fn read(&self) -> Result<Option<String>, AtomicFileError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AtomicFileError::io(&self.path)(e)),
        }
    }

    /// Replaces the file contents atomically.
    pub fn write(&self, content: &str) -> Result<(), AtomicFileError> {
        // Same directory, so the rename stays on one filesystem
        let tmp_path = self.temp_path()?;
        let _lock = FileLock::acquire(&self.path)?;

        let mut tmp_file = File::create(&tmp_path).map_err(AtomicFileError::io(&tmp_path))?;
        tmp_file
            .write_all(content.as_bytes())
            .and_then(|()| tmp_file.sync_all())
            .map_err(AtomicFileError::io(&tmp_path))?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).map_err(AtomicFileError::io(&self.path))
    }

    /// Deletes the file. A missing file is not an error.
    pub fn remove(&self) -> Result<(), AtomicFileError> {
        if !self.path.exists() {
            return Ok(());
        }
        let _lock = FileLock::acquire(&self.path)?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AtomicFileError::io(&self.path)(e)),
        }
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicFileError> {
        match (self.path.parent(), self.path.file_name()) {
            (Some(parent), Some(name)) => {
                Ok(parent.join(format!(".{}.tmp", name.to_string_lossy())))
            }
            _ => Err(AtomicFileError::InvalidPath(self.path.clone())),
        }
    }
}

/// Exclusive advisory lock on `<path>.lock`, released when the handle closes.
///
/// The lock file is never deleted, so every opener locks the same inode.
struct FileLock {
    _file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicFileError> {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(AtomicFileError::io(parent))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(AtomicFileError::io(&lock_path))?;
        file.lock_exclusive().map_err(|source| AtomicFileError::Lock {
            path: lock_path.clone(),
            source,
        })?;

        Ok(FileLock { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("nested").join("value.json"));

        file.write("[1,2,3]").unwrap();

        assert_eq!(file.read().unwrap().as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn test_read_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("missing.json"));
        assert!(file.read().unwrap().is_none());
    }

    #[test]
    fn test_write_leaves_no_temp_file_and_keeps_lock_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("value.json"));

        file.write("first").unwrap();
        file.write("second").unwrap();

        assert_eq!(file.read().unwrap().as_deref(), Some("second"));
        let mut names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["value.json".to_string(), "value.lock".to_string()]);
    }

    #[test]
    fn test_lock_is_released_after_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("value.json");
        AtomicFile::new(path.clone()).write("x").unwrap();

        let lock = File::open(path.with_extension("lock")).unwrap();
        lock.try_lock_exclusive().unwrap();
        lock.unlock().unwrap();
    }

    #[test]
    fn test_root_path_is_invalid() {
        let err = AtomicFile::new(PathBuf::from("/")).write("x").unwrap_err();
        assert!(matches!(err, AtomicFileError::InvalidPath(_)));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("value.json"));
        file.write("x").unwrap();

        file.remove().unwrap();
        file.remove().unwrap();

        assert!(file.read().unwrap().is_none());
    }
}
