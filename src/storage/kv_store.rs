//! Key-value persistence port and in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::errors::StorageError;

/// Key → text value store.
///
/// Values are opaque strings (JSON in practice). Implementations use interior
/// mutability so a store can be shared behind an `Arc`.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Returns whether the key existed.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;
    /// All keys in ascending order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

// --- Memory Implementation ---

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: Mutex<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let data = self.data.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut data = self.data.lock().map_err(|_| StorageError::LockPoisoned)?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut data = self.data.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(data.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let data = self.data.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(data.keys().cloned().collect())
    }
}
