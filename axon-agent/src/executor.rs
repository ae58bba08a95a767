//! The think/act executor and its state machine.
//!
//! One executor owns one conversation memory, one gateway binding, and one
//! tool registry. `run` drives a bounded loop: each step asks the model for
//! a completion (think), then dispatches any proposed tool calls in order
//! (act). A successful call to a "special" tool finishes the run; running
//! out of steps ends the loop without finishing.

use axon_common::{AgentState, Error, Memory, Message, Result, Role, ToolCall};
use axon_gateway::{Gateway, ToolChoice};
use axon_tools::{ToolRegistry, ToolSource};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Corrective sentence injected when the stuck detector fires.
const STUCK_PROMPT: &str = "Observed duplicate responses. Consider new strategies and avoid repeating ineffective paths already attempted.";

/// Marker returned by a step whose think phase decided not to act.
const NO_ACTION: &str = "Thinking complete - no action needed";

/// Default step budget per run.
pub const DEFAULT_MAX_STEPS: usize = 30;

/// Earlier duplicates of the latest assistant content needed to count as stuck.
pub const DEFAULT_DUPLICATE_THRESHOLD: usize = 2;

/// Steps between reloads of a dynamic tool source.
pub const DEFAULT_REFRESH_INTERVAL: usize = 5;

/// Static configuration of an executor.
///
/// One parameterized executor replaces a hierarchy of agent subtypes; named
/// presets live in [`crate::presets`].
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub next_step_prompt: String,
    pub max_steps: usize,
    pub duplicate_threshold: usize,
    pub tool_choice: ToolChoice,
    /// Tools whose successful execution ends the run.
    pub special_tools: Vec<String>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            system_prompt: String::new(),
            next_step_prompt: String::new(),
            max_steps: DEFAULT_MAX_STEPS,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            tool_choice: ToolChoice::Auto,
            special_tools: vec!["terminate".to_string()],
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_next_step_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.next_step_prompt = prompt.into();
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_duplicate_threshold(mut self, threshold: usize) -> Self {
        self.duplicate_threshold = threshold;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    pub fn with_special_tools(mut self, names: Vec<String>) -> Self {
        self.special_tools = names;
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new("agent")
    }
}

/// The think/act agent executor.
pub struct AgentExecutor {
    config: AgentConfig,
    /// Current next-step prompt; stuck handling prepends to it.
    next_step_prompt: String,
    gateway: Arc<dyn Gateway>,
    tools: ToolRegistry,
    memory: Memory,
    state: AgentState,
    current_step: usize,
    pending_calls: Vec<ToolCall>,
    tool_source: Option<Arc<dyn ToolSource>>,
    refresh_interval: usize,
}

impl AgentExecutor {
    pub fn new(gateway: Arc<dyn Gateway>, config: AgentConfig, tools: ToolRegistry) -> Self {
        Self {
            next_step_prompt: config.next_step_prompt.clone(),
            config,
            gateway,
            tools,
            memory: Memory::new(),
            state: AgentState::Idle,
            current_step: 0,
            pending_calls: Vec::new(),
            tool_source: None,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// Attach a dynamic tool source, reloaded every `refresh_interval` steps.
    pub fn with_tool_source(mut self, source: Arc<dyn ToolSource>, refresh_interval: usize) -> Self {
        self.tool_source = Some(source);
        self.refresh_interval = refresh_interval.max(1);
        self
    }

    /// Bound the conversation memory to `capacity` messages.
    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory = Memory::with_capacity(capacity);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Append a text message to the conversation memory.
    ///
    /// Tool-role messages are refused: they must be paired with a call id,
    /// which only the act phase can do.
    pub fn update_memory(&mut self, role: Role, content: impl Into<String>) {
        let message = match role {
            Role::User => Message::user(content),
            Role::System => Message::system(content),
            Role::Assistant => Message::assistant(content),
            Role::Tool => {
                tracing::error!("tool messages require a call id; ignoring");
                return;
            }
        };
        self.memory.push(message);
    }

    /// Run the think/act loop to completion or step-budget exhaustion.
    ///
    /// Admission requires the idle state; a second concurrent or subsequent
    /// run is rejected. Returns the per-step results, one per line.
    pub async fn run(&mut self, request: &str, cancel: &CancellationToken) -> Result<String> {
        if self.state != AgentState::Idle {
            return Err(Error::InvalidState(self.state));
        }

        if !request.is_empty() {
            self.memory.push(Message::user(request));
        }

        self.state = AgentState::Running;
        let mut results: Vec<String> = Vec::new();

        while self.current_step < self.config.max_steps && self.state != AgentState::Finished {
            self.current_step += 1;
            tracing::info!(
                agent = %self.config.name,
                step = self.current_step,
                max_steps = self.config.max_steps,
                "executing step"
            );

            if self.tool_source.is_some() && self.current_step % self.refresh_interval == 0 {
                self.refresh_tools().await;
                if self.state == AgentState::Finished {
                    results.push(format!("Step {}: {NO_ACTION}", self.current_step));
                    break;
                }
            }

            let step_result = match self.step(cancel).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(step = self.current_step, error = %e, "step failed");
                    self.state = AgentState::Error;
                    return Err(e);
                }
            };

            if self.is_stuck() {
                self.handle_stuck();
            }

            results.push(format!("Step {}: {step_result}", self.current_step));
        }

        if self.current_step >= self.config.max_steps {
            results.push(format!(
                "Terminated: Reached max steps ({})",
                self.config.max_steps
            ));
        }

        if self.current_step == 0 {
            return Ok("No steps executed".to_string());
        }

        Ok(results.join("\n"))
    }

    /// One step: think, then act if the think phase asked for it.
    async fn step(&mut self, cancel: &CancellationToken) -> Result<String> {
        let should_act = self.think(cancel).await?;
        if !should_act {
            return Ok(NO_ACTION.to_string());
        }
        self.act(cancel).await
    }

    /// Consult the model and decide whether to act.
    async fn think(&mut self, cancel: &CancellationToken) -> Result<bool> {
        if !self.next_step_prompt.is_empty() {
            self.memory.push(Message::user(self.next_step_prompt.clone()));
        }

        let system = if self.config.system_prompt.is_empty() {
            None
        } else {
            Some(self.config.system_prompt.as_str())
        };
        let specs = self.tools.specs();

        let ask = self.gateway.ask_with_tools(
            self.memory.messages(),
            system,
            &specs,
            self.config.tool_choice,
        );
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = ask => outcome,
        };

        let completion = match outcome {
            Ok(completion) => completion,
            Err(e) => {
                self.memory
                    .push(Message::assistant(format!("Error encountered while processing: {e}")));
                return Err(e);
            }
        };

        tracing::info!(
            agent = %self.config.name,
            selected_tools = completion.tool_calls.len(),
            "thoughts: {}",
            completion.content
        );
        if !completion.tool_calls.is_empty() {
            let names: Vec<&str> = completion
                .tool_calls
                .iter()
                .map(|c| c.function.name.as_str())
                .collect();
            tracing::info!(agent = %self.config.name, tools = ?names, "tools being prepared");
        }

        self.pending_calls = completion.tool_calls.clone();

        let assistant_message = if completion.tool_calls.is_empty() {
            Message::assistant(completion.content.clone())
        } else {
            Message::from_tool_calls(completion.content.clone(), completion.tool_calls)
        };
        self.memory.push(assistant_message);

        match self.config.tool_choice {
            ToolChoice::None => {
                if !self.pending_calls.is_empty() {
                    tracing::warn!(
                        agent = %self.config.name,
                        "model proposed tool calls although tools were unavailable; discarding"
                    );
                    self.pending_calls.clear();
                }
                Ok(!completion.content.is_empty())
            }
            // Absence of calls is surfaced inside act, not here.
            ToolChoice::Required => Ok(true),
            ToolChoice::Auto => {
                if self.pending_calls.is_empty() {
                    Ok(!completion.content.is_empty())
                } else {
                    Ok(true)
                }
            }
        }
    }

    /// Execute the pending tool calls sequentially, in proposed order.
    ///
    /// Later calls may depend on side effects of earlier ones and the
    /// conversation log must keep call/response pairing, so there is no
    /// reordering and no parallelism. A finishing special tool flips the
    /// state immediately but the rest of the batch still executes.
    async fn act(&mut self, cancel: &CancellationToken) -> Result<String> {
        if self.pending_calls.is_empty() {
            if self.config.tool_choice == ToolChoice::Required {
                return Err(Error::ToolCallsRequired);
            }

            if let Some(last) = self.memory.last() {
                if let Some(content) = &last.content {
                    return Ok(content.clone());
                }
            }
            return Ok("No content or commands to execute".to_string());
        }

        let calls = std::mem::take(&mut self.pending_calls);
        let mut results = Vec::with_capacity(calls.len());

        for call in &calls {
            let (observation, success) = self.execute_call(call, cancel).await?;

            self.memory.push(Message::tool(
                observation.clone(),
                call.function.name.clone(),
                call.id.clone(),
            ));

            if success && self.is_special_tool(&call.function.name) {
                tracing::info!(
                    agent = %self.config.name,
                    tool = %call.function.name,
                    "special tool has completed the task"
                );
                self.state = AgentState::Finished;
            }

            results.push(observation);
        }

        Ok(results.join("\n\n"))
    }

    /// Dispatch one tool call and format its conversation observation.
    ///
    /// Tool-level failures never escalate to the step; the only error out
    /// of here is cancellation.
    async fn execute_call(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> Result<(String, bool)> {
        let name = call.function.name.as_str();
        if name.is_empty() {
            return Ok(("Error: Invalid command format".to_string(), false));
        }

        tracing::info!(agent = %self.config.name, tool = name, "activating tool");
        let dispatch = self.tools.dispatch(name, &call.function.arguments);
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            result = dispatch => result,
        };

        if let Some(error) = &result.error {
            return Ok((format!("Error: {error}"), false));
        }

        tracing::info!(
            agent = %self.config.name,
            tool = name,
            output_len = result.output.len(),
            "tool completed"
        );
        Ok((
            format!(
                "Observed output of cmd `{name}` executed:\n{}",
                result.output
            ),
            true,
        ))
    }

    /// Whether the latest assistant content repeats earlier assistant
    /// messages at least `duplicate_threshold` times.
    pub fn is_stuck(&self) -> bool {
        let messages = self.memory.messages();
        let Some((index, latest)) = messages
            .iter()
            .enumerate()
            .rev()
            .find(|(_, m)| m.role == Role::Assistant)
        else {
            return false;
        };

        let content = latest.content_str();
        if content.is_empty() {
            return false;
        }

        let duplicates = messages[..index]
            .iter()
            .filter(|m| m.role == Role::Assistant && m.content_str() == content)
            .count();

        duplicates >= self.config.duplicate_threshold
    }

    /// Prepend the corrective sentence to the next-step prompt.
    ///
    /// The trigger is not reset, so the detector may fire again on the very
    /// next step.
    fn handle_stuck(&mut self) {
        self.next_step_prompt = format!("{STUCK_PROMPT}\n{}", self.next_step_prompt);
        tracing::warn!(
            agent = %self.config.name,
            "agent detected stuck state, added corrective prompt"
        );
    }

    fn is_special_tool(&self, name: &str) -> bool {
        self.config.special_tools.iter().any(|n| n == name)
    }

    /// Reload the registry from the dynamic tool source.
    ///
    /// An empty inventory means the source shut down; the run ends. Special
    /// tools already registered are carried over so the run can still
    /// terminate itself.
    async fn refresh_tools(&mut self) {
        let Some(source) = self.tool_source.clone() else {
            return;
        };

        match source.list_tools().await {
            Ok(tools) => {
                if tools.is_empty() {
                    tracing::info!(
                        agent = %self.config.name,
                        "tool source is no longer available, ending interaction"
                    );
                    self.state = AgentState::Finished;
                    return;
                }

                let mut registry = ToolRegistry::with_tools(tools);
                for name in &self.config.special_tools {
                    if !registry.contains(name) {
                        if let Some(tool) = self.tools.get(name) {
                            registry.register(tool);
                        }
                    }
                }
                tracing::debug!(
                    agent = %self.config.name,
                    tools = registry.len(),
                    "tool registry refreshed"
                );
                self.tools = registry;
            }
            Err(e) => {
                tracing::warn!(agent = %self.config.name, error = %e, "failed to refresh tools");
            }
        }
    }
}
