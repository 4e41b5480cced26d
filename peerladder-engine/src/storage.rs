//! Local storage backends for the two files a local identity owns.
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::identity::StorageSlot;

/// Trait for abstracting the host's local, per-machine storage.
/// Platform-specific implementations should provide this.
pub trait RatingStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the raw bytes of a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn read(&self, slot: &StorageSlot) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Replace the contents of a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    fn write(&self, slot: &StorageSlot, bytes: &[u8]) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One file per slot under a root directory. Writes go through a temp file and a
/// rename so a crash mid-write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, slot: &StorageSlot) -> PathBuf {
        self.root.join(slot.file_name())
    }
}

impl RatingStorage for FileStorage {
    type Error = FileStorageError;

    fn read(&self, slot: &StorageSlot) -> Result<Option<Vec<u8>>, Self::Error> {
        let path = self.path_for(slot);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FileStorageError::Read { path, source }),
        }
    }

    fn write(&self, slot: &StorageSlot, bytes: &[u8]) -> Result<(), Self::Error> {
        let path = self.path_for(slot);
        let tmp = path.with_extension("tmp");
        let wrap = |source: std::io::Error| FileStorageError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(wrap)?;
        fs::write(&tmp, bytes).map_err(wrap)?;
        fs::rename(&tmp, &path).map_err(wrap)
    }
}

#[derive(Debug, Error)]
#[error("storage rejected the write to {0}")]
pub struct MemoryStorageError(pub String);

/// In-memory storage. Clones share the same backing map, so a test can keep a
/// handle, drop the engine, and reopen the "disk" with a fresh engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    fail_writes: Rc<RefCell<bool>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }

    /// Raw bytes stored under a file name.
    #[must_use]
    pub fn get(&self, file_name: &str) -> Option<Vec<u8>> {
        self.slots.borrow().get(file_name).cloned()
    }

    /// Overwrite raw bytes under a file name, bypassing any checks.
    pub fn put(&self, file_name: &str, bytes: Vec<u8>) {
        self.slots.borrow_mut().insert(file_name.to_string(), bytes);
    }

    #[must_use]
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl RatingStorage for MemoryStorage {
    type Error = MemoryStorageError;

    fn read(&self, slot: &StorageSlot) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.get(&slot.file_name()))
    }

    fn write(&self, slot: &StorageSlot, bytes: &[u8]) -> Result<(), Self::Error> {
        if *self.fail_writes.borrow() {
            return Err(MemoryStorageError(slot.file_name()));
        }
        self.put(&slot.file_name(), bytes.to_vec());
        Ok(())
    }
}
