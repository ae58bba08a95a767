//! Named executor presets.
//!
//! One parameterized [`AgentExecutor`] covers every agent variant;
//! presets bundle a prompt, a tool registry, and a configuration under a
//! name instead of introducing subtypes.

use crate::executor::{AgentConfig, AgentExecutor};
use axon_common::Result;
use axon_gateway::Gateway;
use axon_tools::{PlanStore, PlanningTool, TerminateTool, Tool, ToolRegistry};
use std::sync::Arc;

const GENERAL_SYSTEM_PROMPT: &str = "You are Axon, an all-capable AI assistant, aimed at solving any task presented by the user. You have various tools at your disposal that you can call upon to efficiently complete complex requests.";

const GENERAL_NEXT_STEP_PROMPT: &str = "Based on user needs, proactively select the most appropriate tool or combination of tools. For complex tasks, break the problem down and work through it step by step, using the planning tool to track progress. After using each tool, clearly explain the execution results and suggest the next steps. Call terminate when the request is fully handled.";

/// General-purpose assistant: plan tracking plus termination.
///
/// Plans created during the run are persisted through the given store.
pub fn general(gateway: Arc<dyn Gateway>, plan_store: PlanStore) -> Result<AgentExecutor> {
    let planning = PlanningTool::new(plan_store)?;
    let tools = ToolRegistry::with_tools([
        Arc::new(planning) as Arc<dyn Tool>,
        Arc::new(TerminateTool::new()) as Arc<dyn Tool>,
    ]);

    let config = AgentConfig::new("general")
        .with_description("A versatile agent that can solve various tasks using multiple tools")
        .with_system_prompt(GENERAL_SYSTEM_PROMPT)
        .with_next_step_prompt(GENERAL_NEXT_STEP_PROMPT);

    Ok(AgentExecutor::new(gateway, config, tools))
}
