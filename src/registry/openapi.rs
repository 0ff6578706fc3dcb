//! OpenAPI document → tool descriptors.
//!
//! Only write-style operations (`post`, `put`, `patch`) become tools. Their
//! parameters come from the JSON request body schema, with local `$ref`
//! pointers resolved against the same document.

use serde_json::Value;

use super::errors::RegistryError;
use super::types::{group_description, OriginKind, ParameterSchema, ToolDescriptor};

/// HTTP methods whose operations are exposed as tools.
const WRITE_METHODS: [&str; 3] = ["post", "put", "patch"];

/// Invocation-verb suffixes stripped from operation ids, checked in order.
/// At most one is removed.
const VERB_SUFFIXES: [&str; 6] = [
    "_create",
    "_partial_update",
    "_update",
    "_post",
    "_put",
    "_patch",
];

/// Derive a tool name from an operation id (or path).
///
/// `get_weather_create` → `get-weather`. Returns `None` when nothing is left.
pub fn normalize_operation_name(raw: &str) -> Option<String> {
    let stem = VERB_SUFFIXES
        .iter()
        .find_map(|suffix| raw.strip_suffix(suffix))
        .unwrap_or(raw);

    let mut name = String::with_capacity(stem.len());
    let mut in_separator = false;
    for ch in stem.chars() {
        if ch == '_' || ch == '/' || ch == '.' || ch.is_whitespace() {
            if !in_separator {
                name.push('-');
                in_separator = true;
            }
        } else {
            name.push(ch);
            in_separator = false;
        }
    }

    let name = name.trim_matches('-');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Resolve a local JSON reference such as `#/components/schemas/Weather`.
///
/// Remote references are not supported and resolve to `None`.
pub fn resolve_ref<'a>(doc: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    doc.pointer(pointer)
}

/// Follow `$ref` chains until a concrete object is reached.
fn deref<'a>(doc: &'a Value, mut value: &'a Value) -> Result<&'a Value, String> {
    // Bounded so a self-referencing schema cannot loop.
    for _ in 0..16 {
        match value.get("$ref").and_then(Value::as_str) {
            Some(reference) => {
                value = resolve_ref(doc, reference)
                    .ok_or_else(|| format!("unresolvable $ref '{reference}'"))?;
            }
            None => return Ok(value),
        }
    }
    Err("$ref chain too deep".to_string())
}

/// Walk an OpenAPI document and build descriptors for `group`.
///
/// Malformed operations are skipped with a warning; a document without a
/// `paths` object is rejected as a whole.
pub fn descriptors_from_openapi(
    doc: &Value,
    group: &str,
    base_url: &str,
) -> Result<Vec<ToolDescriptor>, RegistryError> {
    let paths = doc
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| RegistryError::InvalidSchema {
            provider: group.to_string(),
            reason: "missing 'paths' object".to_string(),
        })?;

    let mut descriptors = Vec::new();

    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for (method, operation) in item {
            let method_lc = method.to_ascii_lowercase();
            if !WRITE_METHODS.contains(&method_lc.as_str()) {
                continue;
            }
            match descriptor_for_operation(doc, group, base_url, path, &method_lc, operation) {
                Ok(Some(descriptor)) => descriptors.push(descriptor),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(provider = %group, error = %e, "skipping operation");
                }
            }
        }
    }

    Ok(descriptors)
}

fn descriptor_for_operation(
    doc: &Value,
    group: &str,
    base_url: &str,
    path: &str,
    method: &str,
    operation: &Value,
) -> Result<Option<ToolDescriptor>, RegistryError> {
    let malformed = |reason: String| RegistryError::MalformedOperation {
        method: method.to_uppercase(),
        path: path.to_string(),
        reason,
    };

    let raw_name = match operation.get("operationId").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => path.replace('/', "_"),
    };
    let Some(name) = normalize_operation_name(&raw_name) else {
        tracing::debug!(provider = %group, path, method, "operation name normalizes to empty, skipping");
        return Ok(None);
    };

    let parameter_schema = request_body_schema(doc, operation).map_err(malformed)?;

    let text = operation
        .get("description")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .or_else(|| operation.get("summary").and_then(Value::as_str))
        .unwrap_or_default();

    Ok(Some(ToolDescriptor {
        name,
        description: group_description(group, text),
        parameter_schema,
        group: group.to_string(),
        origin: OriginKind::Server,
        provider_endpoint: base_url.to_string(),
        invocation_path: path.to_string(),
        method: method.to_uppercase(),
    }))
}

/// Extract `requestBody.content["application/json"].schema` as a parameter
/// schema. No request body (or no JSON content) yields an empty schema.
fn request_body_schema(doc: &Value, operation: &Value) -> Result<ParameterSchema, String> {
    let Some(body) = operation.get("requestBody") else {
        return Ok(ParameterSchema::default());
    };
    let body = deref(doc, body)?;

    let Some(schema) = body
        .get("content")
        .and_then(|c| c.get("application/json"))
        .and_then(|c| c.get("schema"))
    else {
        return Ok(ParameterSchema::default());
    };
    let schema = deref(doc, schema)?;

    let properties = match schema.get("properties") {
        None => serde_json::Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err("'properties' is not an object".to_string()),
    };

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(ParameterSchema {
        properties,
        required,
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_doc() -> Value {
        json!({
            "openapi": "3.1.0",
            "paths": {
                "/get_weather": {
                    "post": {
                        "operationId": "get_weather_create",
                        "summary": "Get current weather",
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/WeatherRequest"}
                                }
                            }
                        }
                    },
                    "get": {"operationId": "read_weather"}
                }
            },
            "components": {
                "schemas": {
                    "WeatherRequest": {
                        "type": "object",
                        "properties": {"city": {"type": "string"}},
                        "required": ["city"]
                    }
                }
            }
        })
    }

    #[test]
    fn test_normalize_strips_one_suffix() {
        assert_eq!(normalize_operation_name("get_weather_create").as_deref(), Some("get-weather"));
        assert_eq!(normalize_operation_name("item_partial_update").as_deref(), Some("item"));
        assert_eq!(normalize_operation_name("item_update_post").as_deref(), Some("item-update"));
        assert_eq!(normalize_operation_name("search").as_deref(), Some("search"));
    }

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize_operation_name("/files/read.text/").as_deref(), Some("files-read-text"));
        assert_eq!(normalize_operation_name("a__b  c").as_deref(), Some("a-b-c"));
        assert_eq!(normalize_operation_name("_create"), None);
        assert_eq!(normalize_operation_name("__"), None);
    }

    #[test]
    fn test_weather_operation_with_ref() {
        let tools = descriptors_from_openapi(&weather_doc(), "weather", "http://w:8001").unwrap();
        assert_eq!(tools.len(), 1, "GET operations are not tools");

        let tool = &tools[0];
        assert_eq!(tool.name, "get-weather");
        assert_eq!(tool.description, "(weather) Get current weather");
        assert_eq!(tool.invocation_path, "/get_weather");
        assert_eq!(tool.method, "POST");
        assert_eq!(tool.origin, OriginKind::Server);
        assert_eq!(tool.parameter_schema.required, vec!["city".to_string()]);
        assert_eq!(tool.parameter_schema.properties["city"], json!({"type": "string"}));
    }

    #[test]
    fn test_description_preferred_over_summary() {
        let doc = json!({"paths": {"/x": {"put": {
            "operationId": "x_put", "summary": "short", "description": "long form"
        }}}});
        let tools = descriptors_from_openapi(&doc, "g", "http://g").unwrap();
        assert_eq!(tools[0].description, "(g) long form");
        assert_eq!(tools[0].method, "PUT");
        assert_eq!(tools[0].parameter_schema, ParameterSchema::default());
    }

    #[test]
    fn test_missing_operation_id_uses_path() {
        let doc = json!({"paths": {"/convert/units": {"post": {}}}});
        let tools = descriptors_from_openapi(&doc, "g", "http://g").unwrap();
        assert_eq!(tools[0].name, "convert-units");
        assert_eq!(tools[0].description, "(g)");
    }

    #[test]
    fn test_unresolvable_ref_skips_operation() {
        let doc = json!({"paths": {
            "/bad": {"post": {"operationId": "bad", "requestBody": {"content": {
                "application/json": {"schema": {"$ref": "#/components/schemas/Missing"}}
            }}}},
            "/good": {"post": {"operationId": "good"}}
        }});
        let tools = descriptors_from_openapi(&doc, "g", "http://g").unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["good"]);
    }

    #[test]
    fn test_non_object_properties_skips_operation() {
        let doc = json!({"paths": {"/bad": {"post": {"requestBody": {"content": {
            "application/json": {"schema": {"properties": ["city"]}}
        }}}}}});
        let tools = descriptors_from_openapi(&doc, "g", "http://g").unwrap();
        assert!(tools.is_empty());
    }

    #[test]
    fn test_missing_paths_is_invalid() {
        let err = descriptors_from_openapi(&json!({"openapi": "3.0"}), "g", "http://g").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSchema { .. }));
    }

    #[test]
    fn test_resolve_ref_remote_unsupported() {
        let doc = weather_doc();
        assert!(resolve_ref(&doc, "other.json#/x").is_none());
        assert!(resolve_ref(&doc, "#/components/schemas/WeatherRequest").is_some());
    }
}
