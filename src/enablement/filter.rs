//! Per-turn projection of the registry onto the enabled groups.

use super::store::EnablementMap;
use crate::registry::ToolDescriptor;

/// Descriptors whose group maps to `true`, in registry order.
pub fn filter_enabled<'a>(
    descriptors: &'a [ToolDescriptor],
    map: &EnablementMap,
) -> Vec<&'a ToolDescriptor> {
    descriptors
        .iter()
        .filter(|d| map.get(&d.group).copied().unwrap_or(false))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{OriginKind, ParameterSchema};

    fn tool(name: &str, group: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            description: String::new(),
            parameter_schema: ParameterSchema::default(),
            group: group.into(),
            origin: OriginKind::Server,
            provider_endpoint: "http://x".into(),
            invocation_path: format!("/{name}"),
            method: "POST".into(),
        }
    }

    #[test]
    fn test_only_enabled_groups_pass() {
        let tools = vec![tool("a", "on"), tool("b", "off"), tool("c", "missing"), tool("d", "on")];
        let map: EnablementMap = [("on".to_string(), true), ("off".to_string(), false)]
            .into_iter()
            .collect();

        let names: Vec<_> = filter_enabled(&tools, &map)
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "d"]);
    }

    #[test]
    fn test_empty_map_filters_everything() {
        let tools = vec![tool("a", "on")];
        assert!(filter_enabled(&tools, &EnablementMap::new()).is_empty());
    }
}
