//! Flow and executor seams.

use async_trait::async_trait;
use axon_agent::AgentExecutor;
use axon_common::{AgentState, Result};
use tokio_util::sync::CancellationToken;

/// A multi-agent flow over a single input.
#[async_trait]
pub trait Flow: Send {
    /// Execute the flow and return its textual report.
    async fn execute(&mut self, input: &str, cancel: &CancellationToken) -> Result<String>;
}

/// Narrow capability interface a flow needs from an executor.
///
/// Every executor variant exposes exactly this surface; flows never inspect
/// concrete agent types.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    fn name(&self) -> &str;

    fn state(&self) -> AgentState;

    /// Run the executor against one step description.
    async fn run(&mut self, request: &str, cancel: &CancellationToken) -> Result<String>;
}

#[async_trait]
impl StepExecutor for AgentExecutor {
    fn name(&self) -> &str {
        AgentExecutor::name(self)
    }

    fn state(&self) -> AgentState {
        AgentExecutor::state(self)
    }

    async fn run(&mut self, request: &str, cancel: &CancellationToken) -> Result<String> {
        AgentExecutor::run(self, request, cancel).await
    }
}
