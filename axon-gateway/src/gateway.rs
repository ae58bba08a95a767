//! Gateway trait for model backends.
//!
//! Implementations handle authentication, request formatting, and response
//! parsing for a specific completion API. Any transport or model failure
//! surfaces as a single error value; retry is an optional wrapping policy,
//! not part of this contract.

use async_trait::async_trait;
use axon_common::{Message, Result, ToolCall};
use axon_tools::ToolSpec;
use serde::{Deserialize, Serialize};

/// Constraint given to the model on whether it may propose tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model must not call tools.
    None,
    /// The model decides.
    #[default]
    Auto,
    /// The model must call at least one tool.
    Required,
}

impl ToolChoice {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Auto => "auto",
            Self::Required => "required",
        }
    }
}

impl std::fmt::Display for ToolChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model completion: text content and/or proposed tool calls.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Model gateway trait.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Gateway name (e.g. "openai").
    fn name(&self) -> &str;

    /// Ask for a plain completion.
    ///
    /// An empty completion is an error.
    async fn ask(&self, messages: &[Message], system: Option<&str>) -> Result<String>;

    /// Ask for a completion with tool schemas and a tool-choice policy.
    async fn ask_with_tools(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolSpec],
        tool_choice: ToolChoice,
    ) -> Result<Completion>;
}
