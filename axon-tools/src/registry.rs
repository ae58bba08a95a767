//! Name-keyed tool registry and uniform dispatch.
//!
//! Dispatch decodes the raw argument payload and maps every failure mode
//! (unknown name, malformed payload, tool execution error) to a structured
//! per-call result. A bad tool call must never abort the run that issued it.

use crate::traits::{Tool, ToolResult, ToolSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry mapping unique tool names to tool implementations.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, for stable spec listings.
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Create a registry from a set of tools.
    pub fn with_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool. Re-registering a name silently overwrites.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Function-calling specs for every registered tool, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Decode a raw argument payload and invoke the named tool.
    ///
    /// Never fails the caller: unknown names, malformed payloads, and tool
    /// execution errors all come back as per-call results with the error
    /// channel set.
    pub async fn dispatch(&self, name: &str, raw_args: &str) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::failure(format!("Tool {name} is invalid"));
        };

        let args = match parse_args(raw_args) {
            Ok(args) => args,
            Err(_) => {
                return ToolResult::failure(format!(
                    "Error parsing arguments for {name}: Invalid JSON format"
                ));
            }
        };

        tracing::debug!(tool = name, "executing tool");
        match tool.execute(args).await {
            Ok(result) => result,
            Err(e) => ToolResult::failure(format!("Tool '{name}' encountered a problem: {e}")),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a raw JSON argument payload. Empty payloads decode as `{}`.
fn parse_args(raw: &str) -> serde_json::Result<serde_json::Value> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    Ok(serde_json::Value::Object(map))
}
