//! Durable key-value storage and the local fallback store built on it.
//!
//! [`KeyValueStorage`] is the `getItem`/`setItem` surface the catalog persists through.
//! Two backends ship with the crate: [`MemoryStorage`] (process lifetime, optional quota)
//! and [`FileStorage`] (one JSON file per key under a directory).

mod file;
mod local;
mod memory;

pub use file::FileStorage;
pub use local::{generate_local_id, LocalStore, LOCAL_ID_PREFIX};
pub use memory::MemoryStorage;

use std::fmt;
use std::sync::Arc;

use crate::config::StorageConfig;

/// Storage error type
#[derive(Debug)]
pub enum StorageError {
    /// Underlying I/O failure
    Io(std::io::Error),
    /// Payload could not be encoded or decoded
    Serialization(String),
    /// The write would exceed the storage quota
    QuotaExceeded { key: String, limit: usize },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "Storage I/O error: {}", e),
            StorageError::Serialization(msg) => write!(f, "Storage serialization error: {}", msg),
            StorageError::QuotaExceeded { key, limit } => {
                write!(f, "Storage quota of {} bytes exceeded while writing '{}'", limit, key)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// String-valued durable storage addressed by fixed keys.
pub trait KeyValueStorage: Send + Sync {
    /// Value stored under `key`, or `None` when absent.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Open the backend selected by `config`: file-backed when a directory is set, memory otherwise.
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn KeyValueStorage>, StorageError> {
    match &config.dir {
        Some(dir) => Ok(Arc::new(FileStorage::open(dir)?)),
        None => {
            log::info!("No storage directory configured; local data lasts for this process only");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}
