//! Tool registry: the deduplicated, ordered descriptor set.

use std::collections::HashMap;

use super::types::{GroupedTools, OriginKind, ToolDescriptor, ToolGroup, ToolSummary};
use crate::inference::types::ToolDefinition;

// ─── ToolRegistry ────────────────────────────────────────────────────────────

/// Aggregated tools in registration order.
///
/// Names are unique: the first descriptor registered under a name wins and
/// later duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one descriptor. Returns `false` if the name was already taken.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> bool {
        if let Some(&existing) = self.by_name.get(&descriptor.name) {
            tracing::debug!(
                tool = %descriptor.name,
                kept_group = %self.tools[existing].group,
                dropped_group = %descriptor.group,
                "duplicate tool name, keeping first"
            );
            return false;
        }
        self.by_name
            .insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(descriptor);
        true
    }

    /// Register a batch in order. Returns how many were kept.
    pub fn register_all(&mut self, descriptors: impl IntoIterator<Item = ToolDescriptor>) -> usize {
        descriptors
            .into_iter()
            .map(|d| self.register(d))
            .filter(|kept| *kept)
            .count()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn all(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Distinct group names in first-seen order.
    pub fn groups(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for tool in &self.tools {
            if !seen.contains(&tool.group) {
                seen.push(tool.group.clone());
            }
        }
        seen
    }

    /// Tools per origin kind, then per group, in registration order.
    pub fn grouped(&self) -> GroupedTools {
        let mut grouped = GroupedTools::default();
        for tool in &self.tools {
            let (groups, url) = match tool.origin {
                OriginKind::Module => (&mut grouped.module, None),
                OriginKind::Server => (&mut grouped.server, Some(tool.provider_endpoint.clone())),
            };
            let summary = ToolSummary {
                name: tool.name.clone(),
                description: tool.description.clone(),
            };
            match groups.iter_mut().find(|g| g.name == tool.group) {
                Some(group) => group.tools.push(summary),
                None => groups.push(ToolGroup {
                    name: tool.group.clone(),
                    url,
                    tools: vec![summary],
                }),
            }
        }
        grouped
    }

    /// OpenAI `tools` array for the given descriptors.
    pub fn to_tool_definitions<'a>(
        descriptors: impl IntoIterator<Item = &'a ToolDescriptor>,
    ) -> Vec<ToolDefinition> {
        descriptors
            .into_iter()
            .map(ToolDescriptor::to_tool_definition)
            .collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
