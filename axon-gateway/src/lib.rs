//! Axon Gateway - model backend abstraction.
//!
//! Defines the `Gateway` trait consumed by the agent executor, an
//! OpenAI-compatible HTTP implementation, and an optional retry wrapper.

pub mod gateway;
pub mod openai;
pub mod retry;

pub use gateway::{Completion, Gateway, ToolChoice};
pub use openai::OpenAiGateway;
pub use retry::RetryGateway;
