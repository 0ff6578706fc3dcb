//! Agent Core — per-turn orchestration.
//!
//! Submodules:
//! - `conversation`: Conversation Assembler (persona, few-shot, history, attachments)
//! - `dispatcher`: Concurrent tool dispatch with per-call isolation
//! - `turn`: `Agent` and `Session`; the turn state machine and finalizer
//! - `types`: Shared types across the agent core
//! - `errors`: Agent-level error types

pub mod conversation;
pub mod dispatcher;
pub mod errors;
pub mod turn;
pub mod types;

// Re-exports for convenience
pub use conversation::{split_file_context, ConversationAssembler};
pub use dispatcher::ToolDispatcher;
pub use errors::AgentError;
pub use turn::{Agent, Session};
pub use types::{
    Attachment, ConversationMessage, ToolCallRequest, ToolInvocationResult, TurnOutcome,
    TurnState,
};
