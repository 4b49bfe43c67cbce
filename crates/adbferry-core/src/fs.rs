//! Local file system abstraction for testability.
//!
//! The transfer engine only touches the local disk in a few places: creating
//! the destination directory, checking for and removing partial files after
//! a failed pull, and reading file sizes for transfer statistics. Those
//! operations live behind the [`FileSystem`] trait so engine tests can run
//! against an in-memory implementation.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, FileSystemError, Result};

/// Converts an I/O error for read operations.
fn read_error(path: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::ReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Converts an I/O error for directory creation.
fn create_dir_error(path: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::CreateDirFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Converts an I/O error for delete operations.
fn delete_error(path: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::DeleteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Abstraction over local file system operations used by the transfer engine.
pub trait FileSystem: Send + Sync {
    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Get file metadata (size, kind).
    fn metadata(&self, path: &Path) -> Result<FileMetadata>;
}

/// Simplified metadata structure for the operations the engine performs.
#[derive(Debug, Clone, Copy)]
pub struct FileMetadata {
    /// File size in bytes.
    pub len: u64,
    /// Whether this is a regular file.
    pub is_file: bool,
}

impl FileMetadata {
    /// Create metadata from std::fs::Metadata.
    #[must_use]
    pub fn from_std(meta: &Metadata) -> Self {
        Self {
            len: meta.len(),
            is_file: meta.is_file(),
        }
    }
}

/// Real file system implementation using std::fs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl RealFileSystem {
    /// Create a new real file system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| create_dir_error(path, e))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| delete_error(path, e))
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let meta = fs::metadata(path).map_err(|e| read_error(path, e))?;
        Ok(FileMetadata::from_std(&meta))
    }
}

#[cfg(test)]
pub mod mock {
    //! In-memory file system for engine tests.

    #![allow(clippy::expect_used)]

    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory mock tracking file sizes and directories.
    #[derive(Debug, Default)]
    pub struct MockFileSystem {
        files: Mutex<HashMap<PathBuf, u64>>,
        dirs: Mutex<HashSet<PathBuf>>,
    }

    impl MockFileSystem {
        /// Create a new empty mock file system.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a file with the given size.
        pub fn add_file(&self, path: impl AsRef<Path>, len: u64) {
            self.files
                .lock()
                .expect("lock poisoned")
                .insert(path.as_ref().to_path_buf(), len);
        }

        /// Directories created through the trait so far.
        #[must_use]
        pub fn created_dirs(&self) -> Vec<PathBuf> {
            self.dirs
                .lock()
                .expect("lock poisoned")
                .iter()
                .cloned()
                .collect()
        }
    }

    impl FileSystem for MockFileSystem {
        fn exists(&self, path: &Path) -> bool {
            self.files.lock().expect("lock poisoned").contains_key(path)
                || self.dirs.lock().expect("lock poisoned").contains(path)
        }

        fn create_dir_all(&self, path: &Path) -> Result<()> {
            self.dirs
                .lock()
                .expect("lock poisoned")
                .insert(path.to_path_buf());
            Ok(())
        }

        fn remove_file(&self, path: &Path) -> Result<()> {
            if self
                .files
                .lock()
                .expect("lock poisoned")
                .remove(path)
                .is_none()
            {
                return Err(Error::FileSystem(FileSystemError::NotFound {
                    path: path.to_path_buf(),
                }));
            }
            Ok(())
        }

        fn metadata(&self, path: &Path) -> Result<FileMetadata> {
            let files = self.files.lock().expect("lock poisoned");
            if let Some(len) = files.get(path) {
                return Ok(FileMetadata {
                    len: *len,
                    is_file: true,
                });
            }
            if self.dirs.lock().expect("lock poisoned").contains(path) {
                return Ok(FileMetadata {
                    len: 0,
                    is_file: false,
                });
            }
            Err(Error::FileSystem(FileSystemError::NotFound {
                path: path.to_path_buf(),
            }))
        }
    }
}
