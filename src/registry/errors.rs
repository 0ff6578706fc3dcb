//! Registry error types.

use thiserror::Error;

/// Errors raised while building the tool registry.
///
/// None of these abort aggregation: a failing provider is logged and skipped.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The provider's capability schema could not be fetched.
    #[error("provider '{provider}' unreachable at {url}: {reason}")]
    ProviderUnreachable {
        provider: String,
        url: String,
        reason: String,
    },

    /// The provider answered, but not with a usable OpenAPI document.
    #[error("provider '{provider}' returned an invalid schema: {reason}")]
    InvalidSchema { provider: String, reason: String },

    /// A single operation could not be turned into a tool.
    #[error("malformed operation {method} {path}: {reason}")]
    MalformedOperation {
        method: String,
        path: String,
        reason: String,
    },

    #[error("failed to build HTTP client: {reason}")]
    HttpClient { reason: String },
}
