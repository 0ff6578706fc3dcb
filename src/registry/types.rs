//! Canonical tool descriptors and the grouped presentation view.

use serde::{Deserialize, Serialize};

use crate::inference::types::{FunctionDefinition, ToolDefinition};

/// Where a tool came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
    /// Declared statically in config.
    Module,
    /// Discovered from a provider's OpenAPI document.
    Server,
}

impl OriginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginKind::Module => "module",
            OriginKind::Server => "server",
        }
    }
}

/// Object-schema parameters of a tool: property map plus required names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ParameterSchema {
    /// JSON Schema object sent to the model as `function.parameters`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// A tool as the rest of the engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique after aggregation.
    pub name: String,
    pub description: String,
    pub parameter_schema: ParameterSchema,
    /// Module or provider name; the unit of enablement.
    pub group: String,
    pub origin: OriginKind,
    /// Base address the invocation path is joined to.
    pub provider_endpoint: String,
    pub invocation_path: String,
    /// Uppercase HTTP method.
    pub method: String,
}

impl ToolDescriptor {
    pub fn invocation_url(&self) -> String {
        join_url(&self.provider_endpoint, &self.invocation_path)
    }

    pub fn to_tool_definition(&self) -> ToolDefinition {
        ToolDefinition {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name.clone(),
                description: self.description.clone(),
                parameters: self.parameter_schema.to_json(),
            },
        }
    }
}

/// Join a base URL and a path with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// `"({group}) {text}"`, or just `"({group})"` when there is no text.
pub fn group_description(group: &str, text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        format!("({group})")
    } else {
        format!("({group}) {text}")
    }
}

// ─── Grouped view ────────────────────────────────────────────────────────────

/// `{ "module": [...], "server": [...] }` as shown to users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedTools {
    pub module: Vec<ToolGroup>,
    pub server: Vec<ToolGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub tools: Vec<ToolSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_single_slash() {
        assert_eq!(join_url("http://h:1/", "/a/b/"), "http://h:1/a/b/");
        assert_eq!(join_url("http://h:1", "a"), "http://h:1/a");
    }

    #[test]
    fn test_tool_definition_shape() {
        let mut properties = serde_json::Map::new();
        properties.insert("city".into(), serde_json::json!({"type": "string"}));
        let desc = ToolDescriptor {
            name: "get-weather".into(),
            description: "(weather) Weather".into(),
            parameter_schema: ParameterSchema {
                properties,
                required: vec!["city".into()],
            },
            group: "weather".into(),
            origin: OriginKind::Server,
            provider_endpoint: "http://h".into(),
            invocation_path: "/get_weather".into(),
            method: "POST".into(),
        };
        let def = serde_json::to_value(desc.to_tool_definition()).unwrap();
        assert_eq!(def["type"], "function");
        assert_eq!(def["function"]["parameters"]["type"], "object");
        assert_eq!(def["function"]["parameters"]["required"][0], "city");
        assert_eq!(desc.invocation_url(), "http://h/get_weather");
    }

    #[test]
    fn test_grouped_view_omits_missing_url() {
        let grouped = GroupedTools {
            module: vec![ToolGroup {
                name: "builtin".into(),
                url: None,
                tools: vec![],
            }],
            server: vec![],
        };
        let json = serde_json::to_value(&grouped).unwrap();
        assert!(json["module"][0].get("url").is_none());
        assert!(json["server"].as_array().unwrap().is_empty());
    }
}
