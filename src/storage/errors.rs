//! Persistence error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing database failed.
    #[error("database error: {reason}")]
    DatabaseError { reason: String },

    /// The store's lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,

    #[error("serialization error: {reason}")]
    SerializationError { reason: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::DatabaseError {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::SerializationError {
            reason: e.to_string(),
        }
    }
}
