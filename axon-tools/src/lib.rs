//! Axon Tools - capability system for the agent runtime.
//!
//! Provides the trait-based tool contract, the name-keyed registry with
//! uniform dispatch, and the built-in control tools:
//! - `terminate`: ends a run when the task is done
//! - `planning`: creates and tracks multi-step plans, persisted as JSON
//!   records per plan id

pub mod planning;
pub mod registry;
pub mod source;
pub mod terminate;
pub mod traits;

pub use planning::{Plan, PlanStep, PlanStepStatus, PlanStore, PlanningTool};
pub use registry::ToolRegistry;
pub use source::ToolSource;
pub use terminate::TerminateTool;
pub use traits::{Tool, ToolResult, ToolSpec};
