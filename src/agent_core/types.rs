//! Shared types for the agent core.
//!
//! Conversation messages, tool results, attachments and the turn state
//! machine's trace.

use serde::{Deserialize, Serialize};

use crate::inference::types::{ChatMessage, FunctionCallResponse, Role, ToolCallResponse};

// ─── Conversation Messages ──────────────────────────────────────────────────

/// One tool call requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub tool_name: String,
    /// Raw arguments as the model produced them; may be empty or non-JSON.
    pub arguments_json: String,
}

/// A single message in a session's history.
///
/// `tool_calls` is only set on assistant messages that request tools, and
/// `tool_call_id` only on tool-role messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ConversationMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    pub fn assistant_tool_calls(content: Option<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Requested tool calls, empty when there are none.
    pub fn requested_calls(&self) -> &[ToolCallRequest] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    /// Wire form for the chat-completion request.
    pub fn to_chat_message(&self) -> ChatMessage {
        let tool_calls = self.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|tc| ToolCallResponse {
                    id: tc.id.clone(),
                    r#type: "function".to_string(),
                    function: FunctionCallResponse {
                        name: tc.tool_name.clone(),
                        arguments: tc.arguments_json.clone(),
                    },
                })
                .collect()
        });
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
            tool_call_id: self.tool_call_id.clone(),
            tool_calls,
        }
    }
}

impl From<ChatMessage> for ConversationMessage {
    fn from(msg: ChatMessage) -> Self {
        let tool_calls = msg
            .tool_calls
            .filter(|calls| !calls.is_empty())
            .map(|calls| {
                calls
                    .into_iter()
                    .map(|tc| ToolCallRequest {
                        id: tc.id,
                        tool_name: tc.function.name,
                        arguments_json: tc.function.arguments,
                    })
                    .collect()
            });
        Self {
            role: msg.role,
            content: msg.content,
            tool_calls,
            tool_call_id: msg.tool_call_id,
        }
    }
}

// ─── Tool Results ───────────────────────────────────────────────────────────

/// Outcome of one tool call. Failures are data, never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub tool_call_id: String,
    pub tool_name: String,
    /// Success payload as text, or a human-readable error.
    pub content: String,
    pub success: bool,
    pub execution_time_ms: u64,
}

// ─── Attachments ────────────────────────────────────────────────────────────

/// A file whose text is inlined into the user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub content: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

// ─── Turn ───────────────────────────────────────────────────────────────────

/// States of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    AwaitingInitialResponse,
    DispatchingTools,
    AwaitingFollowupResponse,
    Done,
}

/// What a turn produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// The final assistant message (also appended to history).
    pub message: ConversationMessage,
    /// States visited, ending in [`TurnState::Done`].
    pub states: Vec<TurnState>,
    /// Tool results of the round, in call order; empty if no tools ran.
    pub tool_results: Vec<ToolInvocationResult>,
    /// The turn ended on a model error.
    pub is_error: bool,
}

impl TurnOutcome {
    /// The answer text shown to the user.
    pub fn text(&self) -> &str {
        self.message.content.as_deref().unwrap_or_default()
    }
}
