//! Conversation Assembler — builds the message sequence for one turn.
//!
//! Fixed order: persona, few-shot demonstration, prior history verbatim,
//! then the new user message with any attachments inlined ahead of the
//! typed question.

use super::types::{Attachment, ConversationMessage, ToolCallRequest};
use crate::config::ConversationConfig;

// ─── Attachment framing ─────────────────────────────────────────────────────

const FILE_HEADER: &str = "CONTEXT FROM FILE: ";
const SEPARATOR: &str = "\n\n---\n\n";
const QUESTION_MARKER: &str = "QUESTION:\n";

/// Inline attachments ahead of the typed text.
///
/// Each file becomes `CONTEXT FROM FILE: {name}\n\n---\n\n{content}`, files
/// are joined by the separator, and the block is followed by
/// `\n\n---\n\nQUESTION:\n{text}`. Without attachments the text is returned
/// as is.
pub fn build_user_content(text: &str, attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return text.to_string();
    }
    let files: Vec<String> = attachments
        .iter()
        .map(|a| format!("{FILE_HEADER}{}{SEPARATOR}{}", a.name, a.content))
        .collect();
    format!("{}{SEPARATOR}{QUESTION_MARKER}{text}", files.join(SEPARATOR))
}

/// Recover `(attachments, question)` from content built by
/// [`build_user_content`].
///
/// Content without the framing comes back as `([], content)`. Separators
/// inside a file body are rejoined. Two inputs are ambiguous: a file body
/// containing `"\n\n---\n\nCONTEXT FROM FILE: "` splits into an extra
/// attachment, and a typed question containing the `QUESTION:` framing
/// splits at its last occurrence.
pub fn split_file_context(content: &str) -> (Vec<Attachment>, String) {
    let question_split = format!("{SEPARATOR}{QUESTION_MARKER}");
    let Some((block, question)) = content
        .starts_with(FILE_HEADER)
        .then(|| content.rsplit_once(&question_split))
        .flatten()
    else {
        return (Vec::new(), content.to_string());
    };

    let parts: Vec<&str> = block.split(SEPARATOR).collect();
    let mut attachments = Vec::new();
    let mut i = 0;
    while i < parts.len() {
        match parts[i].strip_prefix(FILE_HEADER) {
            Some(name) => {
                let mut body = parts.get(i + 1).copied().unwrap_or_default().to_string();
                i += 2;
                // Separators inside a file body: rejoin until the next header.
                while i < parts.len() && !parts[i].starts_with(FILE_HEADER) {
                    body.push_str(SEPARATOR);
                    body.push_str(parts[i]);
                    i += 1;
                }
                attachments.push(Attachment::new(name, body));
            }
            None => i += 1,
        }
    }

    (attachments, question.to_string())
}

// ─── Few-shot demonstration ─────────────────────────────────────────────────

/// A short exchange showing the model that independent lookups should be
/// issued as parallel tool calls in a single assistant message.
pub fn few_shot_messages() -> Vec<ConversationMessage> {
    let call = |id: &str, city: &str| ToolCallRequest {
        id: id.to_string(),
        tool_name: "get-weather".to_string(),
        arguments_json: serde_json::json!({ "city": city }).to_string(),
    };
    vec![
        ConversationMessage::user("What's the weather in Paris and in Tokyo?"),
        ConversationMessage::assistant_tool_calls(
            None,
            vec![call("example_call_1", "Paris"), call("example_call_2", "Tokyo")],
        ),
        ConversationMessage::tool_result(
            "example_call_1",
            r#"{"city": "Paris", "temperature_c": 18, "conditions": "cloudy"}"#,
        ),
        ConversationMessage::tool_result(
            "example_call_2",
            r#"{"city": "Tokyo", "temperature_c": 24, "conditions": "sunny"}"#,
        ),
        ConversationMessage::assistant(
            "It is 18°C and cloudy in Paris, and 24°C and sunny in Tokyo.",
        ),
    ]
}

// ─── ConversationAssembler ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConversationAssembler {
    persona: Option<String>,
    few_shot: bool,
}

impl ConversationAssembler {
    pub fn new(persona: Option<String>, few_shot: bool) -> Self {
        Self {
            persona: persona.filter(|p| !p.trim().is_empty()),
            few_shot,
        }
    }

    pub fn from_config(config: &ConversationConfig) -> Self {
        Self::new(config.persona.clone(), config.few_shot)
    }

    /// The full sequence for one request, ending with the new user message.
    pub fn assemble(
        &self,
        history: &[ConversationMessage],
        text: &str,
        attachments: &[Attachment],
    ) -> Vec<ConversationMessage> {
        let mut messages = self.preamble();
        messages.extend(history.iter().cloned());
        messages.push(Self::user_message(text, attachments));
        messages
    }

    /// Persona and few-shot messages that precede the history.
    pub fn preamble(&self) -> Vec<ConversationMessage> {
        let mut messages = Vec::new();
        if let Some(persona) = &self.persona {
            messages.push(ConversationMessage::system(persona.clone()));
        }
        if self.few_shot {
            messages.extend(few_shot_messages());
        }
        messages
    }

    pub fn user_message(text: &str, attachments: &[Attachment]) -> ConversationMessage {
        ConversationMessage::user(build_user_content(text, attachments))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
