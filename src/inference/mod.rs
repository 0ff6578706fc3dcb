//! Inference client for an OpenAI-compatible chat-completion endpoint.
//!
//! The client speaks the Chat Completions API, so the model behind it is
//! interchangeable via config.

pub mod client;
pub mod errors;
pub mod response;
pub mod types;

pub use client::InferenceClient;
pub use errors::InferenceError;
pub use types::{ChatMessage, FunctionDefinition, Role, ToolCallResponse, ToolDefinition};
