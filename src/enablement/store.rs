//! Enablement Store — which tool groups are offered to the model.
//!
//! A `group → enabled` map persisted under the `enablement` key. It is
//! seeded once, on the first discovery that finds no saved map, with every
//! discovered group enabled. After that, only [`EnablementStore::toggle`]
//! changes it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::storage::{KvStore, StorageError};

/// Key under which the map is persisted.
pub const ENABLEMENT_KEY: &str = "enablement";

/// Group name → enabled.
pub type EnablementMap = BTreeMap<String, bool>;

// ─── EnablementStore ────────────────────────────────────────────────────────

pub struct EnablementStore {
    kv: Arc<dyn KvStore>,
    map: Mutex<EnablementMap>,
}

impl EnablementStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            map: Mutex::new(EnablementMap::new()),
        }
    }

    /// Load the persisted map, or seed it from `discovered_groups`.
    ///
    /// A saved map is loaded unchanged, stale keys included; groups it does
    /// not mention stay disabled. With no saved map (or a corrupt one) every
    /// discovered group is enabled and the result is persisted.
    pub fn initialize(&self, discovered_groups: &[String]) -> Result<(), StorageError> {
        let mut map = self.map.lock().map_err(|_| StorageError::LockPoisoned)?;

        if let Some(persisted) = self.load_persisted()? {
            tracing::info!(groups = persisted.len(), "loaded enablement map");
            *map = persisted;
            return Ok(());
        }

        *map = discovered_groups
            .iter()
            .map(|g| (g.clone(), true))
            .collect();
        self.save(&map)?;
        tracing::info!(groups = map.len(), "seeded enablement map, all groups enabled");
        Ok(())
    }

    /// Flip a group and persist. An unknown group becomes enabled.
    ///
    /// Returns the new state.
    pub fn toggle(&self, group: &str) -> Result<bool, StorageError> {
        let mut map = self.map.lock().map_err(|_| StorageError::LockPoisoned)?;
        let enabled = !map.get(group).copied().unwrap_or(false);
        map.insert(group.to_string(), enabled);
        self.save(&map)?;
        tracing::info!(group, enabled, "enablement toggled");
        Ok(enabled)
    }

    /// Absent groups are disabled.
    pub fn is_enabled(&self, group: &str) -> bool {
        self.map
            .lock()
            .map(|map| map.get(group).copied().unwrap_or(false))
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> EnablementMap {
        self.map.lock().map(|map| map.clone()).unwrap_or_default()
    }

    // ─── Persistence ────────────────────────────────────────────────────

    /// The saved map, or `None` if absent or unparseable.
    fn load_persisted(&self) -> Result<Option<EnablementMap>, StorageError> {
        let Some(raw) = self.kv.get(ENABLEMENT_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<EnablementMap>(&raw) {
            Ok(map) => Ok(Some(map)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse enablement map, re-initializing");
                Ok(None)
            }
        }
    }

    fn save(&self, map: &EnablementMap) -> Result<(), StorageError> {
        let content = serde_json::to_string(map)?;
        self.kv.set(ENABLEMENT_KEY, &content)?;
        tracing::debug!(groups = map.len(), "saved enablement map");
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
