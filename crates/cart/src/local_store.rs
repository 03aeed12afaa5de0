//! Guest-cart persistence.
//!
//! The slot holds the guest cart as a JSON array of lines, in cart order.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use harvest_core::CartLine;

use crate::ports::LocalCartStore;

/// Errors that can occur when reading or writing the guest-cart slot.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Slot path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Slot contents are not a valid line list.
    #[error("corrupt guest cart: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// File-backed slot.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store writing to `path`. Nothing is touched until the first
    /// save.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the slot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LocalCartStore for JsonFileStore {
    fn load(&self) -> Result<Vec<CartLine>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No guest cart slot yet");
                Ok(Vec::new())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let body = serde_json::to_vec_pretty(lines)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(self.io_error(e)),
            _ => Ok(()),
        }
    }
}

/// In-process slot. Contents are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lines: Mutex<Vec<CartLine>>,
}

impl MemoryStore {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot pre-filled with `lines`.
    #[must_use]
    pub fn with_lines(lines: Vec<CartLine>) -> Self {
        Self {
            lines: Mutex::new(lines),
        }
    }
}

impl LocalCartStore for MemoryStore {
    fn load(&self) -> Result<Vec<CartLine>, StoreError> {
        Ok(self.lines.lock().clone())
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), StoreError> {
        *self.lines.lock() = lines.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.lines.lock().clear();
        Ok(())
    }
}
