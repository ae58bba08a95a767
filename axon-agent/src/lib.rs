//! Axon Agent - the agent execution engine.
//!
//! Provides the core think/act loop:
//! - Appends the request to the conversation memory
//! - Asks the model gateway for a completion with the registry's tool schemas
//! - Dispatches proposed tool calls sequentially and feeds observations back
//! - Ends on a special-tool completion or when the step budget runs out
//!
//! ## Example
//!
//! ```ignore
//! use axon_agent::{presets, AgentExecutor};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut agent = presets::general(gateway, plan_store)?;
//! let report = agent.run("Summarize the quarterly numbers", &CancellationToken::new()).await?;
//! ```

pub mod executor;
pub mod presets;

pub use executor::{AgentConfig, AgentExecutor, DEFAULT_DUPLICATE_THRESHOLD, DEFAULT_MAX_STEPS};
