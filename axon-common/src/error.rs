//! Error types for the Axon runtime.

use crate::schema::AgentState;
use thiserror::Error;

/// Result type alias using the Axon error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the Axon runtime.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run admission refused: the agent is not idle
    #[error("cannot run agent from state: {0}")]
    InvalidState(AgentState),

    /// Model gateway failure (transport or model level)
    #[error("Model gateway error: {0}")]
    Gateway(String),

    /// The tool-choice policy required calls but the model proposed none
    #[error("tool calls required but none provided")]
    ToolCallsRequired,

    /// Flow-level failure
    #[error("Flow error: {0}")]
    Flow(String),

    /// The run was cancelled externally
    #[error("operation cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this is a cancellation error.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this is a gateway error.
    pub const fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }
}
