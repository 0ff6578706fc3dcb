//! Chat-completion response parsing.
//!
//! Turns the raw response body into a single assistant [`ChatMessage`].
//! Tool calls normally arrive in the structured `tool_calls` field; some
//! served models instead emit them inline as `<tool_call>{…}</tool_call>`
//! blocks in `content`, which are recovered here.

use uuid::Uuid;

use super::errors::InferenceError;
use super::types::{
    ChatCompletionResponse, ChatMessage, CompletionToolCall, FunctionCallResponse, Role,
    ToolCallResponse,
};

const TOOL_CALL_OPEN: &str = "<tool_call>";
const TOOL_CALL_CLOSE: &str = "</tool_call>";
const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Parse a non-streaming response body into the assistant message of its
/// first choice.
pub fn parse_completion_response(body: &str) -> Result<ChatMessage, InferenceError> {
    let resp: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::ProtocolMismatch {
            reason: format!("failed to parse completion response: {e}"),
        })?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or(InferenceError::ProtocolMismatch {
            reason: "empty choices array".into(),
        })?;

    if choice.finish_reason.as_deref() == Some("length") {
        tracing::warn!("completion stopped at the token limit; reply may be cut short");
    }

    let mut content = choice.message.content.filter(|c| !c.is_empty());

    let mut tool_calls: Vec<ToolCallResponse> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(normalize_tool_call)
        .collect();

    if tool_calls.is_empty() {
        if let Some(text) = content.as_deref() {
            if text.contains(TOOL_CALL_OPEN) {
                let inline = parse_inline_tool_calls(text);
                if !inline.is_empty() {
                    tracing::info!(count = inline.len(), "recovered tool calls from message content");
                    content = extract_think(text);
                    tool_calls = inline;
                }
            }
        }
    }

    Ok(ChatMessage {
        role: Role::Assistant,
        content,
        tool_call_id: None,
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
    })
}

/// Give every call an id and coerce arguments into a JSON string.
fn normalize_tool_call(tc: CompletionToolCall) -> ToolCallResponse {
    ToolCallResponse {
        id: tc
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_call_id),
        r#type: "function".to_string(),
        function: FunctionCallResponse {
            name: tc.function.name,
            arguments: arguments_to_string(tc.function.arguments),
        },
    }
}

fn arguments_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn generate_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Extract every `<tool_call>{"name": …, "arguments": …}</tool_call>` block.
///
/// Blocks that are not valid JSON or lack a name are skipped with a warning.
fn parse_inline_tool_calls(text: &str) -> Vec<ToolCallResponse> {
    let mut calls = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(TOOL_CALL_OPEN) {
        let after_open = &rest[start + TOOL_CALL_OPEN.len()..];
        let (inner, remaining) = match after_open.find(TOOL_CALL_CLOSE) {
            Some(end) => (&after_open[..end], &after_open[end + TOOL_CALL_CLOSE.len()..]),
            None => (after_open, ""),
        };
        rest = remaining;

        let parsed: serde_json::Value = match serde_json::from_str(inner.trim()) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse inline tool call");
                continue;
            }
        };
        let Some(name) = parsed.get("name").and_then(|n| n.as_str()) else {
            tracing::warn!("inline tool call has no name");
            continue;
        };
        let arguments = parsed
            .get("arguments")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        calls.push(ToolCallResponse {
            id: generate_call_id(),
            r#type: "function".to_string(),
            function: FunctionCallResponse {
                name: name.to_string(),
                arguments: arguments_to_string(arguments),
            },
        });
    }

    calls
}

/// The reasoning inside `<think>…</think>`, if any.
fn extract_think(text: &str) -> Option<String> {
    let start = text.find(THINK_OPEN)? + THINK_OPEN.len();
    let end = text[start..].find(THINK_CLOSE).map_or(text.len(), |e| start + e);
    let inner = text[start..end].trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_content() {
        let body = r#"{
            "choices": [{
                "message": {"role": "assistant", "content": "Hello, world!"},
                "finish_reason": "stop"
            }]
        }"#;
        let msg = parse_completion_response(body).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content.as_deref(), Some("Hello, world!"));
        assert!(msg.tool_calls.is_none());
    }

    #[test]
    fn test_length_finish_keeps_partial_content() {
        let body = r#"{
            "choices": [{
                "message": {"role": "assistant", "content": "The forecast for"},
                "finish_reason": "length"
            }]
        }"#;
        let msg = parse_completion_response(body).unwrap();
        assert_eq!(msg.content.as_deref(), Some("The forecast for"));
    }

    #[test]
    fn test_parse_with_tool_calls() {
        let body = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_1", "type": "function",
                         "function": {"name": "get-weather", "arguments": "{\"city\":\"London\"}"}},
                        {"type": "function",
                         "function": {"name": "get-weather", "arguments": {"city": "Paris"}}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let msg = parse_completion_response(body).unwrap();
        let calls = msg.tool_calls.unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.arguments, r#"{"city":"London"}"#);
        assert!(calls[1].id.starts_with("call_"));
        assert_eq!(calls[1].function.arguments, r#"{"city":"Paris"}"#);
        assert!(msg.content.is_none());
    }

    #[test]
    fn test_parse_empty_choices() {
        let err = parse_completion_response(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, InferenceError::ProtocolMismatch { .. }));
    }

    #[test]
    fn test_parse_not_json() {
        let err = parse_completion_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, InferenceError::ProtocolMismatch { .. }));
    }

    #[test]
    fn test_parse_inline_tool_call_in_content() {
        let body = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "<think>need weather</think>\n<tool_call>{\"name\": \"get-weather\", \"arguments\": {\"city\": \"Oslo\"}}</tool_call>"
                }
            }]
        })
        .to_string();
        let msg = parse_completion_response(&body).unwrap();
        let calls = msg.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "get-weather");
        assert_eq!(calls[0].function.arguments, r#"{"city":"Oslo"}"#);
        assert_eq!(msg.content.as_deref(), Some("need weather"));
    }

    #[test]
    fn test_parse_inline_tool_call_invalid_json_keeps_content() {
        let body = serde_json::json!({
            "choices": [{"message": {"content": "<tool_call>{not json}</tool_call>"}}]
        })
        .to_string();
        let msg = parse_completion_response(&body).unwrap();
        assert!(msg.tool_calls.is_none());
        assert_eq!(msg.content.as_deref(), Some("<tool_call>{not json}</tool_call>"));
    }

    #[test]
    fn test_extract_think_absent() {
        assert_eq!(extract_think("no reasoning here"), None);
    }
}
