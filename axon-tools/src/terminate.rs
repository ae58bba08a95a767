//! The termination tool.
//!
//! The default "special" tool: a successful invocation signals that the run
//! is complete and flips the executor to the finished state.

use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;

/// Tool the model calls to end the interaction.
pub struct TerminateTool;

impl TerminateTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminateTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for TerminateTool {
    fn name(&self) -> &str {
        "terminate"
    }

    fn description(&self) -> &str {
        "Terminate the interaction when the request is met OR if the assistant cannot proceed further with the task."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "description": "The finish status of the interaction.",
                    "enum": ["success", "failure"]
                }
            },
            "required": ["status"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let status = match args.get("status").and_then(|v| v.as_str()) {
            Some(s) if !s.is_empty() => s,
            _ => "success",
        };
        Ok(ToolResult::success(format!(
            "The interaction has been completed with status: {status}"
        )))
    }
}
