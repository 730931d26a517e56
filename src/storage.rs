//! Text file access rooted at the virtual SD card directory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage root is not set")]
    NoRoot,
    #[error("{path} not found")]
    NotFound { path: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.display().to_string();
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound { path }
        } else {
            StorageError::Io { path, source }
        }
    }
}

/// Read/write access to small text files addressed relative to a root
pub trait Storage: Send + Sync {
    fn read(&self, path: &str) -> Result<String, StorageError>;
    fn write(&self, path: &str, text: &str) -> Result<(), StorageError>;
    fn ensure_root(&self) -> Result<(), StorageError>;
}

/// A directory on disk standing in for the robot's SD card
#[derive(Debug, Clone)]
pub struct SdCardStorage {
    root: PathBuf,
}

impl SdCardStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SdCardStorage { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        if self.root.as_os_str().is_empty() {
            return Err(StorageError::NoRoot);
        }
        Ok(self.root.join(path))
    }
}

impl Storage for SdCardStorage {
    fn read(&self, path: &str) -> Result<String, StorageError> {
        let full = self.resolve(path)?;
        fs::read_to_string(&full).map_err(|e| StorageError::from_io(&full, e))
    }

    fn write(&self, path: &str, text: &str) -> Result<(), StorageError> {
        self.ensure_root()?;
        let full = self.resolve(path)?;
        fs::write(&full, text).map_err(|e| StorageError::from_io(&full, e))
    }

    fn ensure_root(&self) -> Result<(), StorageError> {
        if self.root.as_os_str().is_empty() {
            return Err(StorageError::NoRoot);
        }
        if self.root.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.root).map_err(|e| StorageError::Io {
            path: self.root.display().to_string(),
            source: e,
        })
    }
}

/// In-memory storage, used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let files = files
            .into_iter()
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect();
        MemoryStorage {
            files: Mutex::new(files),
        }
    }

    pub fn file_names(&self) -> Vec<String> {
        let files = self.files.lock().unwrap_or_else(|p| p.into_inner());
        let mut names: Vec<String> = files.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Storage for MemoryStorage {
    fn read(&self, path: &str) -> Result<String, StorageError> {
        let files = self.files.lock().unwrap_or_else(|p| p.into_inner());
        files.get(path).cloned().ok_or_else(|| StorageError::NotFound {
            path: path.to_string(),
        })
    }

    fn write(&self, path: &str, text: &str) -> Result<(), StorageError> {
        let mut files = self.files.lock().unwrap_or_else(|p| p.into_inner());
        files.insert(path.to_string(), text.to_string());
        Ok(())
    }

    fn ensure_root(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
