//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility — these types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur while invoking the chat-completion endpoint.
///
/// Every variant is terminal for the current turn: the client never retries.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the model endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The model endpoint did not respond within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout {
        duration_secs: u64,
    },

    /// Non-2xx HTTP response from the model endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
    },

    /// The request did not fit in the model's context window.
    #[error("context window exceeded: {body}")]
    ContextOverflow {
        body: String,
    },

    /// The endpoint answered with a shape we cannot interpret.
    #[error("protocol mismatch: {reason}")]
    ProtocolMismatch {
        reason: String,
    },
}

impl InferenceError {
    /// Classify a non-2xx response.
    ///
    /// vLLM and llama.cpp answer HTTP 400 with "maximum context length" in the
    /// body when the prompt overflows; that case gets its own variant so the
    /// user sees an actionable message.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 400 && body.contains("maximum context length") {
            InferenceError::ContextOverflow { body }
        } else {
            InferenceError::HttpError { status, body }
        }
    }

    /// Text shown to the user when this error ends a turn.
    pub fn user_message(&self) -> String {
        match self {
            InferenceError::ContextOverflow { .. } => {
                "[Error: The model's context window was exceeded. The tool result was \
                 too large to process. Please ask for a more specific or summarized \
                 result, or try again with a narrower query.]"
                    .to_string()
            }
            other => format!("[Error calling model: {other}]"),
        }
    }
}
