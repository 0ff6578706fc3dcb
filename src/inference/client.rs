//! OpenAI-compatible inference client.
//!
//! Sends one chat-completion request per call and parses the first choice
//! into an assistant message. There is no retry and no fallback model: any
//! failure is returned as a single terminal [`InferenceError`].

use std::time::Duration;

use reqwest::Client as HttpClient;

use super::errors::InferenceError;
use super::response::parse_completion_response;
use super::types::{ChatCompletionRequest, ChatMessage, ToolDefinition};
use crate::config::ModelConfig;

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the chat-completion endpoint.
pub struct InferenceClient {
    http: HttpClient,
    config: ModelConfig,
}

impl InferenceClient {
    /// Create a client from the `model` config section.
    ///
    /// Does NOT check connectivity; that happens on the first request. The
    /// whole-request timeout is applied only when configured.
    pub fn from_config(config: ModelConfig) -> Result<Self, InferenceError> {
        let mut builder = HttpClient::builder().connect_timeout(CONNECT_TIMEOUT);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http = builder
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, config })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    /// Send `messages` and return the assistant's reply.
    ///
    /// `tools` and `tool_choice: "auto"` are only included in the request when
    /// `tools` is non-empty.
    pub async fn invoke(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, InferenceError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let tools = if tools.is_empty() {
            None
        } else {
            Some(tools.to_vec())
        };

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            temperature: self.config.temperature,
            tool_choice: tools.as_ref().map(|_| "auto".to_string()),
            tools,
        };

        // Request metadata only; the body can be large.
        tracing::info!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            tool_count = body.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "=== LLM REQUEST ==="
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(&url, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_send_error(&url, e))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %text, "model endpoint returned an error");
            return Err(InferenceError::from_status(status.as_u16(), text));
        }

        let message = parse_completion_response(&text)?;

        tracing::info!(
            content_len = message.content.as_ref().map(|c| c.len()).unwrap_or(0),
            tool_calls = message.tool_calls.as_ref().map(|t| t.len()).unwrap_or(0),
            "=== LLM RESPONSE ==="
        );

        Ok(message)
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout {
                duration_secs: self.config.request_timeout_secs.unwrap_or_default(),
            }
        } else {
            InferenceError::ConnectionFailed {
                endpoint: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
