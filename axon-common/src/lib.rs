//! Axon Common - shared types and utilities for the Axon runtime.
//!
//! This crate provides:
//! - The conversation schema (messages, tool calls, bounded memory)
//! - Agent execution states
//! - Configuration types and loading
//! - Error types
//! - Logging setup

pub mod config;
pub mod error;
pub mod logging;
pub mod schema;

pub use config::{LlmOverride, LlmSettings, RuntimeSettings, Settings};
pub use error::{Error, Result};
pub use schema::{AgentState, FunctionCall, Memory, Message, Role, ToolCall};
