//! Agent Core error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::inference::InferenceError;
use crate::registry::RegistryError;
use crate::storage::StorageError;

/// Errors raised while building or driving the agent.
///
/// A turn itself never returns one of these: model failures end the turn
/// with an error-bearing assistant message instead.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// Persistence (enablement map, preferences) failed.
    #[error("storage error: {reason}")]
    StorageError { reason: String },

    #[error("registry error: {reason}")]
    RegistryError { reason: String },

    /// The inference client could not be created.
    #[error("inference error: {reason}")]
    InferenceError { reason: String },

    /// Tool dispatch could not be set up.
    #[error("dispatcher error: {reason}")]
    DispatcherError { reason: String },
}

impl From<ConfigError> for AgentError {
    fn from(e: ConfigError) -> Self {
        AgentError::ConfigError {
            reason: e.to_string(),
        }
    }
}

impl From<StorageError> for AgentError {
    fn from(e: StorageError) -> Self {
        AgentError::StorageError {
            reason: e.to_string(),
        }
    }
}

impl From<RegistryError> for AgentError {
    fn from(e: RegistryError) -> Self {
        AgentError::RegistryError {
            reason: e.to_string(),
        }
    }
}

impl From<InferenceError> for AgentError {
    fn from(e: InferenceError) -> Self {
        AgentError::InferenceError {
            reason: e.to_string(),
        }
    }
}
