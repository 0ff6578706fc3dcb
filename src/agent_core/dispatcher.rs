//! Tool Dispatcher — executes one assistant turn's tool calls.
//!
//! All calls run concurrently and are joined unconditionally, so latency is
//! bounded by the slowest call. Each call is isolated: a failure becomes an
//! error result and never affects its siblings. Results come back in the
//! order the model issued the calls.

use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::{Client as HttpClient, Method};

use super::errors::AgentError;
use super::types::{ToolCallRequest, ToolInvocationResult};
use crate::config::DispatchConfig;
use crate::registry::types::join_url;
use crate::registry::ToolDescriptor;

/// Appended when a result is cut to `max_result_chars`.
const TRUNCATION_NOTICE: &str = "\n[Result truncated]";

/// Where a call is sent.
#[derive(Debug, Clone, PartialEq)]
struct Target {
    url: String,
    method: Method,
}

// ─── ToolDispatcher ─────────────────────────────────────────────────────────

pub struct ToolDispatcher {
    http: HttpClient,
    fallback_endpoint: Option<String>,
    timeout: Option<Duration>,
    max_result_chars: Option<usize>,
}

impl ToolDispatcher {
    pub fn new(config: &DispatchConfig) -> Result<Self, AgentError> {
        let http = HttpClient::builder()
            .build()
            .map_err(|e| AgentError::DispatcherError {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            fallback_endpoint: config.fallback_endpoint.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
            max_result_chars: config.max_result_chars,
        })
    }

    /// Run every call against `tools` concurrently.
    ///
    /// Always returns exactly one result per call, in call order.
    pub async fn dispatch(
        &self,
        calls: &[ToolCallRequest],
        tools: &[&ToolDescriptor],
    ) -> Vec<ToolInvocationResult> {
        let started = Instant::now();
        let futures = calls.iter().map(|call| {
            let target = self.resolve(&call.tool_name, tools);
            self.dispatch_single(call, target)
        });
        let results = join_all(futures).await;

        tracing::info!(
            calls = results.len(),
            failures = results.iter().filter(|r| !r.success).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool round complete"
        );
        results
    }

    /// Registry match by name, else `{fallback_endpoint}/{tool_name}`.
    fn resolve(&self, tool_name: &str, tools: &[&ToolDescriptor]) -> Option<Target> {
        if let Some(tool) = tools.iter().find(|t| t.name == tool_name) {
            return Some(Target {
                url: tool.invocation_url(),
                method: Method::from_bytes(tool.method.as_bytes()).unwrap_or(Method::POST),
            });
        }
        self.fallback_endpoint.as_ref().map(|base| Target {
            url: join_url(base, tool_name),
            method: Method::POST,
        })
    }

    /// Execute one call: send, retry once on the slash-toggled path, and
    /// fold the outcome into a result.
    async fn dispatch_single(
        &self,
        call: &ToolCallRequest,
        target: Option<Target>,
    ) -> ToolInvocationResult {
        let start = Instant::now();

        let Some(target) = target else {
            return self.error_result(
                call,
                start,
                &format!("unknown tool '{}'", call.tool_name),
            );
        };

        let arguments = parse_arguments(&call.arguments_json);

        let outcome = match self.send(&target.method, &target.url, &arguments).await {
            Ok(body) => Ok(body),
            Err(first) => {
                let retry_url = toggle_trailing_slash(&target.url);
                tracing::debug!(
                    tool = %call.tool_name,
                    url = %target.url,
                    retry_url = %retry_url,
                    error = %first,
                    "tool call failed, retrying on alternate path"
                );
                self.send(&target.method, &retry_url, &arguments)
                    .await
                    .map_err(|second| format!("{first} (retry on {retry_url}: {second})"))
            }
        };

        match outcome {
            Ok(body) => {
                let content = self.format_success(&body);
                let elapsed = start.elapsed().as_millis() as u64;
                tracing::info!(
                    tool = %call.tool_name,
                    elapsed_ms = elapsed,
                    result_len = content.len(),
                    "tool call succeeded"
                );
                ToolInvocationResult {
                    tool_call_id: call.id.clone(),
                    tool_name: call.tool_name.clone(),
                    content,
                    success: true,
                    execution_time_ms: elapsed,
                }
            }
            Err(reason) => self.error_result(call, start, &reason),
        }
    }

    /// One HTTP attempt. `Err` carries a printable reason.
    async fn send(
        &self,
        method: &Method,
        url: &str,
        arguments: &serde_json::Value,
    ) -> Result<String, String> {
        let mut request = self.http.request(method.clone(), url).json(arguments);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                format!("timed out calling {url}")
            } else {
                format!("request to {url} failed: {e}")
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response from {url}: {e}"))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(format!("HTTP {} from {url}: {body}", status.as_u16()))
        }
    }

    /// Pretty-print JSON bodies, pass other text through, then truncate.
    fn format_success(&self, body: &str) -> String {
        let text = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
            Err(_) => body.to_string(),
        };
        match self.max_result_chars {
            Some(max) => truncate_result(&text, max),
            None => text,
        }
    }

    fn error_result(
        &self,
        call: &ToolCallRequest,
        start: Instant,
        reason: &str,
    ) -> ToolInvocationResult {
        let elapsed = start.elapsed().as_millis() as u64;
        tracing::warn!(
            tool = %call.tool_name,
            call_id = %call.id,
            elapsed_ms = elapsed,
            error = %reason,
            "tool call failed"
        );
        ToolInvocationResult {
            tool_call_id: call.id.clone(),
            tool_name: call.tool_name.clone(),
            content: format!("[Error: {reason}]"),
            success: false,
            execution_time_ms: elapsed,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Parse the model's argument string.
///
/// Empty means `{}`; anything that is not JSON is wrapped as
/// `{"raw_argument": text}`.
pub fn parse_arguments(raw: &str) -> serde_json::Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| serde_json::json!({ "raw_argument": raw }))
}

/// `http://h/a` ↔ `http://h/a/`.
fn toggle_trailing_slash(url: &str) -> String {
    match url.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => format!("{url}/"),
    }
}

/// Keep the first `max` characters and append the truncation notice.
fn truncate_result(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{TRUNCATION_NOTICE}", &text[..cut]),
        None => text.to_string(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::registry::{OriginKind, ParameterSchema};

    /// Stub provider:
    /// - `/echo` returns the request body
    /// - `/slow/{ms}` sleeps then returns `{"slept": ms}`
    /// - `/fail` returns 500 on both path variants
    /// - `/only-slash/` exists only with the trailing slash
    /// - `/invalid` rejects every body with 422; no slash variant
    /// - `/text` returns plain text
    async fn spawn_provider() -> String {
        let app = Router::new()
            .route("/echo", post(|Json(body): Json<serde_json::Value>| async move { Json(body) }))
            .route(
                "/slow/:ms",
                post(|Path(ms): Path<u64>| async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Json(json!({ "slept": ms }))
                }),
            )
            .route("/fail", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
            .route("/fail/", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
            .route(
                "/invalid",
                post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "field 'city' is required") }),
            )
            .route("/only-slash/", post(|| async { Json(json!({"ok": true})) }))
            .route("/text", post(|| async { "plain result" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn descriptor(name: &str, base: &str, path: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: String::new(),
            parameter_schema: ParameterSchema::default(),
            group: "stub".to_string(),
            origin: OriginKind::Server,
            provider_endpoint: base.to_string(),
            invocation_path: path.to_string(),
            method: "POST".to_string(),
        }
    }

    fn call(id: &str, tool: &str, args: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_string(),
            tool_name: tool.to_string(),
            arguments_json: args.to_string(),
        }
    }

    fn dispatcher(config: DispatchConfig) -> ToolDispatcher {
        ToolDispatcher::new(&config).unwrap()
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments(""), json!({}));
        assert_eq!(parse_arguments("  "), json!({}));
        assert_eq!(parse_arguments(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_arguments("London"), json!({"raw_argument": "London"}));
    }

    #[test]
    fn test_toggle_trailing_slash() {
        assert_eq!(toggle_trailing_slash("http://h/a"), "http://h/a/");
        assert_eq!(toggle_trailing_slash("http://h/a/"), "http://h/a");
    }

    #[test]
    fn test_truncate_result_char_boundary() {
        assert_eq!(truncate_result("héllo", 2), "hé\n[Result truncated]");
        assert_eq!(truncate_result("short", 10), "short");
    }

    #[tokio::test]
    async fn test_calls_run_concurrently() {
        let base = spawn_provider().await;
        let tools = [
            descriptor("slow-a", &base, "/slow/400"),
            descriptor("slow-b", &base, "/slow/400"),
            descriptor("slow-c", &base, "/slow/400"),
        ];
        let refs: Vec<&ToolDescriptor> = tools.iter().collect();
        let calls = [call("1", "slow-a", ""), call("2", "slow-b", ""), call("3", "slow-c", "")];

        let started = Instant::now();
        let results = dispatcher(DispatchConfig::default()).dispatch(&calls, &refs).await;
        let elapsed = started.elapsed();

        assert!(results.iter().all(|r| r.success));
        assert!(
            elapsed < Duration::from_millis(1000),
            "three 400ms calls took {elapsed:?}; expected close to 400ms"
        );
    }

    #[tokio::test]
    async fn test_one_failure_does_not_drop_siblings() {
        let base = spawn_provider().await;
        let tools = [
            descriptor("echo", &base, "/echo"),
            descriptor("fail", &base, "/fail"),
            descriptor("text", &base, "/text"),
        ];
        let refs: Vec<&ToolDescriptor> = tools.iter().collect();
        let calls = [
            call("a", "echo", r#"{"x":1}"#),
            call("b", "fail", "{}"),
            call("c", "text", "{}"),
        ];

        let results = dispatcher(DispatchConfig::default()).dispatch(&calls, &refs).await;

        assert_eq!(results.len(), 3);
        let ids: Vec<_> = results.iter().map(|r| r.tool_call_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(results.iter().filter(|r| r.success).count(), 2);

        assert_eq!(results[0].content, serde_json::to_string_pretty(&json!({"x": 1})).unwrap());
        assert!(!results[1].success);
        assert!(results[1].content.starts_with("[Error: "));
        assert!(results[1].content.contains("500"));
        assert_eq!(results[2].content, "plain result");
    }

    #[tokio::test]
    async fn test_retry_on_trailing_slash_variant() {
        let base = spawn_provider().await;
        let tools = [descriptor("slashy", &base, "/only-slash")];
        let refs: Vec<&ToolDescriptor> = tools.iter().collect();

        let results = dispatcher(DispatchConfig::default())
            .dispatch(&[call("1", "slashy", "{}")], &refs)
            .await;
        assert!(results[0].success, "{}", results[0].content);
    }

    #[tokio::test]
    async fn test_failed_retry_keeps_first_error() {
        let base = spawn_provider().await;
        let tools = [descriptor("weather", &base, "/invalid")];
        let refs: Vec<&ToolDescriptor> = tools.iter().collect();

        let results = dispatcher(DispatchConfig::default())
            .dispatch(&[call("1", "weather", "{}")], &refs)
            .await;
        assert!(!results[0].success);
        let content = &results[0].content;
        assert!(content.starts_with("[Error: HTTP 422 from "), "{content}");
        assert!(content.contains("field 'city' is required"), "{content}");
        assert!(content.contains("/invalid/: HTTP 404"), "{content}");
    }

    #[tokio::test]
    async fn test_unmatched_name_uses_fallback_endpoint() {
        let base = spawn_provider().await;
        let d = dispatcher(DispatchConfig {
            fallback_endpoint: Some(base),
            ..DispatchConfig::default()
        });

        let results = d.dispatch(&[call("1", "echo", "Paris")], &[]).await;
        assert!(results[0].success);
        assert!(results[0].content.contains("\"raw_argument\": \"Paris\""));
    }

    #[tokio::test]
    async fn test_unknown_tool_without_fallback() {
        let results = dispatcher(DispatchConfig::default())
            .dispatch(&[call("1", "nope", "{}")], &[])
            .await;
        assert!(!results[0].success);
        assert_eq!(results[0].content, "[Error: unknown tool 'nope']");
        assert_eq!(results[0].tool_name, "nope");
    }

    #[tokio::test]
    async fn test_result_truncation() {
        let base = spawn_provider().await;
        let tools = [descriptor("text", &base, "/text")];
        let refs: Vec<&ToolDescriptor> = tools.iter().collect();
        let d = dispatcher(DispatchConfig {
            max_result_chars: Some(5),
            ..DispatchConfig::default()
        });

        let results = d.dispatch(&[call("1", "text", "")], &refs).await;
        assert_eq!(results[0].content, "plain\n[Result truncated]");
    }

    #[tokio::test]
    async fn test_per_call_timeout() {
        let base = spawn_provider().await;
        let tools = [descriptor("slow", &base, "/slow/3000")];
        let refs: Vec<&ToolDescriptor> = tools.iter().collect();
        let d = dispatcher(DispatchConfig {
            timeout_secs: Some(1),
            ..DispatchConfig::default()
        });

        let results = d.dispatch(&[call("1", "slow", "")], &refs).await;
        // First attempt times out; the slash-variant retry 404s.
        assert!(!results[0].success);
        assert!(results[0].execution_time_ms < 2500);
    }
}
