//! Persistence port: a key → value store behind the [`KvStore`] trait.
//!
//! Holds the enablement map (key `enablement`) and session preferences
//! (keys `pref:{name}`).

pub mod errors;
pub mod kv_store;
pub mod preferences;
pub mod sqlite;

pub use errors::StorageError;
pub use kv_store::{KvStore, MemoryKvStore};
pub use preferences::Preferences;
pub use sqlite::SqliteKvStore;
