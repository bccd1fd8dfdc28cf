//! Device-local cart persistence.
//!
//! The entire item list (and nothing else) is serialized as JSON under a
//! single namespaced key after every mutation and read back once at
//! startup. Backends are pluggable through [`CartStorage`]; production
//! uses [`FileStorage`], tests use [`MemoryStorage`].
//!
//! The persisted shape carries no version tag; older snapshots are assumed
//! field-compatible with the current [`CartItem`] layout.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::types::CartItem;

/// Namespaced key under which the item list is stored.
pub const STORAGE_KEY: &str = "cart-storage";

/// Errors that can occur reading or writing the persisted cart.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted cart could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistence backend for the cart item list.
pub trait CartStorage {
    /// Read the persisted item list. `Ok(None)` means nothing has been
    /// persisted yet.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreadable or holds a malformed
    /// snapshot.
    fn load(&self) -> Result<Option<Vec<CartItem>>, StorageError>;

    /// Replace the persisted item list with `items`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be written.
    fn save(&self, items: &[CartItem]) -> Result<(), StorageError>;
}

/// JSON-file backend: one file named after [`STORAGE_KEY`] in a configured
/// directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Store the cart under `dir/cart-storage.json`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for FileStorage {
    fn load(&self) -> Result<Option<Vec<CartItem>>, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let items = serde_json::from_str(&contents)?;
        Ok(Some(items))
    }

    fn save(&self, items: &[CartItem]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to a sibling temp file and rename so the stored snapshot is
        // replaced in a single step.
        let tmp = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string(items)?;
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process backend for tests and ephemeral carts.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<Option<Vec<CartItem>>>,
}

impl MemoryStorage {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Vec<CartItem>>, StorageError> {
        let guard = self.items.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn save(&self, items: &[CartItem]) -> Result<(), StorageError> {
        let mut guard = self.items.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(items.to_vec());
        Ok(())
    }
}
