//! Core Tool trait and types.
//!
//! All tools implement the `Tool` trait, providing a uniform interface for
//! the agent executor to discover and invoke capabilities.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result from executing a tool.
///
/// Exactly one of `output`/`error` is the primary channel when the result
/// is rendered into the conversation; `system` is an auxiliary side-channel
/// (e.g. encoded binary data) that never reaches the model directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool output (result text).
    pub output: String,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Auxiliary payload for the caller, not shown to the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: None,
            system: None,
        }
    }

    /// Create a failed result.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: Some(error.into()),
            system: None,
        }
    }

    /// Attach an auxiliary side-channel payload.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Whether the error channel is empty.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl std::fmt::Display for ToolResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error {
            Some(error) => write!(f, "Error: {error}"),
            None => f.write_str(&self.output),
        }
    }
}

/// Tool specification for model function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name (must match `name()` method).
    pub name: String,
    /// Human-readable description for the model.
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// Trait for agent tools.
///
/// Each tool provides:
/// - `name()`: unique identifier
/// - `description()`: what the tool does (shown to the model)
/// - `parameters()`: JSON Schema for arguments
/// - `execute()`: async function to run the tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for parameters.
    fn parameters(&self) -> serde_json::Value;

    /// Execute the tool with decoded arguments.
    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult>;

    /// Generate a ToolSpec for function calling.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}
