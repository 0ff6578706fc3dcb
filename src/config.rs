//! Runtime configuration loading.
//!
//! Reads `toolrelay.yaml` and resolves environment variables. The file names
//! the model endpoint, the tool providers, the statically declared module
//! tools, and the dispatch/storage knobs.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::registry::ParameterSchema;

/// File name searched for when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "toolrelay.yaml";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TOOLRELAY_CONFIG";

pub const DEFAULT_PERSONA: &str = "You are a powerful and intelligent AI assistant. \
You have access to a variety of tools to help you answer user queries. \
Only use the provided tools if they are relevant to the user's query. \
If the tools are not relevant, you must answer the user's query directly without mentioning the tools.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find {CONFIG_FILE_NAME}")]
    NotFound,

    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {reason}")]
    Parse { reason: String },
}

// ─── Public Types ────────────────────────────────────────────────────────────

/// Top-level configuration (mirrors `toolrelay.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    /// Remote tool providers, queried for `/openapi.json` in this order.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Statically declared tools served by in-process style modules.
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Chat-completion endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Base URL including the API prefix, e.g. `http://localhost:8002/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    /// Whole-request timeout. No timeout when absent.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: 0.0,
            request_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8002/v1".to_string()
}

fn default_model() -> String {
    "chat".to_string()
}

/// A remote provider exposing an OpenAPI document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
}

/// A module whose tools are declared in config rather than discovered.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub tools: Vec<ModuleToolConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleToolConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Invocation path relative to the module's base URL. Defaults to `/{name}`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub parameters: ParameterSchema,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// System message; `None` or empty disables it.
    #[serde(default = "default_persona")]
    pub persona: Option<String>,
    /// Prepend the parallel tool-use demonstration.
    #[serde(default = "default_true")]
    pub few_shot: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            few_shot: true,
        }
    }
}

fn default_persona() -> Option<String> {
    Some(DEFAULT_PERSONA.to_string())
}

fn default_true() -> bool {
    true
}

/// Tool dispatch knobs. Everything is off unless set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchConfig {
    /// Base URL used for tool names that match no descriptor.
    #[serde(default)]
    pub fallback_endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_result_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// SQLite file. Defaults to `{data_dir}/toolrelay.db`.
    #[serde(default)]
    pub path: Option<String>,
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Checks `TOOLRELAY_CONFIG` first, then searches upward from `start` for
/// `toolrelay.yaml`.
pub fn find_config_path(start: &Path) -> Result<PathBuf, ConfigError> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(expand_tilde(&explicit));
        if candidate.exists() {
            return Ok(candidate);
        }
        tracing::warn!(path = %candidate.display(), "{CONFIG_ENV_VAR} points at a missing file");
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(ConfigError::NotFound)
}

/// Load and parse a config file.
///
/// `${VAR_NAME}` and `${VAR_NAME:-default}` are interpolated before parsing.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_config(&raw)
}

/// Parse config text (after interpolation).
pub fn parse_config(raw: &str) -> Result<AppConfig, ConfigError> {
    let interpolated = interpolate_env_vars(raw);
    if interpolated.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
        reason: e.to_string(),
    })
}

/// Find and load the config, falling back to defaults when no file exists.
pub fn load_or_default(start: &Path) -> Result<AppConfig, ConfigError> {
    match find_config_path(start) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "loading config");
            load_config(&path)
        }
        Err(ConfigError::NotFound) => {
            tracing::info!("no {CONFIG_FILE_NAME} found, using defaults");
            Ok(AppConfig::default())
        }
        Err(e) => Err(e),
    }
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
///
/// `$${` is a literal `${`. An expression whose name is not an env-var
/// identifier, or that has no closing `}`, is left as written.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find("${") {
        if rest[..pos].ends_with('$') {
            result.push_str(&rest[..pos - 1]);
            result.push_str("${");
            rest = &rest[pos + 2..];
            continue;
        }
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];

        let Some(close) = after.find('}') else {
            let at: String = rest[pos..].chars().take(24).collect();
            tracing::warn!(at = %at, "unterminated ${{ in config, left as-is");
            result.push_str(&rest[pos..]);
            return result;
        };

        let expr = &after[..close];
        let name = expr.split_once(":-").map_or(expr, |(name, _)| name);
        if is_env_var_name(name) {
            result.push_str(&resolve_var_expr(expr));
        } else {
            result.push_str(&rest[pos..pos + 2 + close + 1]);
        }
        rest = &after[close + 1..];
    }

    result.push_str(rest);
    result
}

fn is_env_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((name, default)) => std::env::var(name).unwrap_or_else(|_| expand_tilde(default)),
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars_with_default() {
        std::env::remove_var("__TOOLRELAY_TEST_MISSING__");
        let result = interpolate_env_vars("url: ${__TOOLRELAY_TEST_MISSING__:-http://fallback}");
        assert_eq!(result, "url: http://fallback");
    }

    #[test]
    fn test_interpolate_env_vars_with_value() {
        std::env::set_var("__TOOLRELAY_TEST_URL__", "http://custom");
        let result = interpolate_env_vars("${__TOOLRELAY_TEST_URL__:-http://fallback}");
        assert_eq!(result, "http://custom");
        std::env::remove_var("__TOOLRELAY_TEST_URL__");
    }

    #[test]
    fn test_interpolate_unterminated_keeps_rest_of_file() {
        let raw = "persona: \"costs ${ a lot\"\nmodel:\n  model: big\n";
        assert_eq!(interpolate_env_vars(raw), raw);
    }

    #[test]
    fn test_interpolate_leaves_non_identifier_and_escaped() {
        std::env::set_var("__TOOLRELAY_TEST_CITY__", "Oslo");
        assert_eq!(interpolate_env_vars("say ${the city} now"), "say ${the city} now");
        assert_eq!(
            interpolate_env_vars("literal $${__TOOLRELAY_TEST_CITY__} vs ${__TOOLRELAY_TEST_CITY__}"),
            "literal ${__TOOLRELAY_TEST_CITY__} vs Oslo"
        );
        std::env::remove_var("__TOOLRELAY_TEST_CITY__");
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand_tilde("~/data");
        assert!(!result.starts_with('~'));
        assert!(result.ends_with("/data"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.model.model, "chat");
        assert!(config.model.request_timeout_secs.is_none());
        assert!(config.conversation.few_shot);
        assert_eq!(config.conversation.persona.as_deref(), Some(DEFAULT_PERSONA));
        assert!(config.dispatch.fallback_endpoint.is_none());
        assert!(config.dispatch.max_result_chars.is_none());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
model:
  base_url: http://localhost:9999/v1
  model: qwen
  temperature: 0.2
  request_timeout_secs: 30
providers:
  - name: weather
    base_url: http://localhost:8001
  - name: search
    base_url: http://localhost:8002
modules:
  - name: builtin
    base_url: http://localhost:9000
    tools:
      - name: get-time
        description: Current time
        parameters:
          properties:
            tz: {type: string}
          required: [tz]
conversation:
  persona: null
  few_shot: false
dispatch:
  fallback_endpoint: http://localhost:9000
  max_result_chars: 4000
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.request_timeout_secs, Some(30));
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[1].name, "search");
        let tool = &config.modules[0].tools[0];
        assert_eq!(tool.parameters.required, vec!["tz".to_string()]);
        assert!(tool.parameters.properties.contains_key("tz"));
        assert!(tool.path.is_none());
        assert!(config.conversation.persona.is_none());
        assert!(!config.conversation.few_shot);
        assert_eq!(config.dispatch.max_result_chars, Some(4000));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("providers: {not: [a list").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_find_config_walks_upward() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "model: {model: x}\n").unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config_path(&nested).unwrap();
        assert_eq!(found, tmp.path().join(CONFIG_FILE_NAME));
        assert_eq!(load_config(&found).unwrap().model.model, "x");
    }
}
