//! Tool discovery and the aggregated tool registry.
//!
//! Provides:
//! - Canonical [`ToolDescriptor`]s for config-declared modules and for
//!   OpenAPI providers
//! - Concurrent provider discovery with per-provider failure isolation
//! - First-occurrence-wins name dedup
//! - A grouped view for presentation

pub mod aggregator;
pub mod errors;
pub mod openapi;
pub mod tool_registry;
pub mod types;

pub use aggregator::RegistryAggregator;
pub use errors::RegistryError;
pub use tool_registry::ToolRegistry;
pub use types::{GroupedTools, OriginKind, ParameterSchema, ToolDescriptor};
