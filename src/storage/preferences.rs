//! Free-form session preferences stored under `pref:{name}` keys.

use std::sync::Arc;

use super::errors::StorageError;
use super::kv_store::KvStore;

const PREFIX: &str = "pref:";

#[derive(Clone)]
pub struct Preferences {
    kv: Arc<dyn KvStore>,
}

impl Preferences {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Read a preference. Entries that are not valid JSON read as absent.
    pub fn get(&self, name: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let Some(raw) = self.kv.get(&key(name))? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(name, error = %e, "malformed preference entry, treating as absent");
                Ok(None)
            }
        }
    }

    pub fn set(&self, name: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        self.kv.set(&key(name), &serde_json::to_string(value)?)
    }

    pub fn remove(&self, name: &str) -> Result<bool, StorageError> {
        self.kv.delete(&key(name))
    }

    /// Preference names (without the key prefix), sorted.
    pub fn names(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .kv
            .keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(PREFIX).map(str::to_string))
            .collect())
    }
}

fn key(name: &str) -> String {
    format!("{PREFIX}{name}")
}
