//! Retry wrapper for gateways.
//!
//! Optional policy layered over any gateway: failed requests are retried
//! with a linear backoff. Cancellation is never retried.

use crate::gateway::{Completion, Gateway, ToolChoice};
use async_trait::async_trait;
use axon_common::{Error, Message, Result};
use axon_tools::ToolSpec;
use std::time::Duration;

/// Default number of attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Gateway wrapper retrying failed requests with linear backoff.
pub struct RetryGateway<G> {
    inner: G,
    max_attempts: usize,
}

impl<G: Gateway> RetryGateway<G> {
    /// Wrap a gateway with the default attempt budget.
    pub fn new(inner: G) -> Self {
        Self::with_max_attempts(inner, DEFAULT_MAX_ATTEMPTS)
    }

    /// Wrap a gateway with an explicit attempt budget (at least 1).
    pub fn with_max_attempts(inner: G, max_attempts: usize) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
        }
    }

    async fn backoff(&self, attempt: usize) {
        if attempt > 0 {
            let wait = Duration::from_secs(attempt as u64);
            tracing::warn!(attempt, wait_secs = attempt, "retrying gateway request");
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl<G: Gateway> Gateway for RetryGateway<G> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn ask(&self, messages: &[Message], system: Option<&str>) -> Result<String> {
        let mut last = None;
        for attempt in 0..self.max_attempts {
            self.backoff(attempt).await;
            match self.inner.ask(messages, system).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::error!(attempt = attempt + 1, error = %e, "gateway request failed");
                    last = Some(e);
                }
            }
        }
        Err(exhausted(self.max_attempts, last))
    }

    async fn ask_with_tools(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolSpec],
        tool_choice: ToolChoice,
    ) -> Result<Completion> {
        let mut last = None;
        for attempt in 0..self.max_attempts {
            self.backoff(attempt).await;
            match self
                .inner
                .ask_with_tools(messages, system, tools, tool_choice)
                .await
            {
                Ok(completion) => return Ok(completion),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::error!(attempt = attempt + 1, error = %e, "gateway request failed");
                    last = Some(e);
                }
            }
        }
        Err(exhausted(self.max_attempts, last))
    }
}

fn exhausted(attempts: usize, last: Option<Error>) -> Error {
    match last {
        Some(e) => Error::Gateway(format!("failed after {attempts} attempts: {e}")),
        None => Error::Gateway(format!("failed after {attempts} attempts")),
    }
}
