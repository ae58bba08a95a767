//! Flow construction by kind.

use crate::base::{Flow, StepExecutor};
use crate::planning::PlanningFlow;
use axon_tools::PlanningTool;
use std::collections::HashMap;

/// Kinds of flows the runtime can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Planning,
}

impl FlowKind {
    /// Parse a flow kind name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planning" => Some(Self::Planning),
            _ => None,
        }
    }
}

/// Build a flow of the given kind over a set of named executors.
pub fn create_flow(
    kind: FlowKind,
    executors: HashMap<String, Box<dyn StepExecutor>>,
    primary_key: &str,
    planning: PlanningTool,
) -> Box<dyn Flow> {
    match kind {
        FlowKind::Planning => Box::new(PlanningFlow::new(executors, primary_key, planning)),
    }
}
