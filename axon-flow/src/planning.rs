//! The planning flow: drive executors over an ordered plan.
//!
//! Protocol per input: synthesize an initial plan, then repeatedly take the
//! first step that is not started or in progress, hand it to an executor,
//! and record the outcome through the planning tool. A blocked step aborts
//! the flow; an executor that reports finished ends it early.

use crate::base::{Flow, StepExecutor};
use async_trait::async_trait;
use axon_common::{AgentState, Error, Result};
use axon_tools::{PlanStepStatus, PlanningTool, Tool};
use serde_json::json;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Step template used until model-generated plans are wired in.
const INITIAL_STEPS: [&str; 4] = [
    "Analyze the request",
    "Plan the solution",
    "Execute the plan",
    "Verify the results",
];

/// Flow executing plan steps through a set of named executors.
pub struct PlanningFlow {
    executors: HashMap<String, Box<dyn StepExecutor>>,
    primary_key: String,
    planning: PlanningTool,
    active_plan_id: Option<String>,
}

impl PlanningFlow {
    /// Create a flow over the given executors.
    ///
    /// An empty `primary_key` designates the lexically first executor.
    pub fn new(
        executors: HashMap<String, Box<dyn StepExecutor>>,
        primary_key: impl Into<String>,
        planning: PlanningTool,
    ) -> Self {
        let mut primary_key = primary_key.into();
        if primary_key.is_empty() {
            if let Some(first) = executors.keys().min() {
                primary_key = first.clone();
            }
        }

        Self {
            executors,
            primary_key,
            planning,
            active_plan_id: None,
        }
    }

    /// Register an executor under a step-type key.
    pub fn add_executor(&mut self, key: impl Into<String>, executor: Box<dyn StepExecutor>) {
        self.executors.insert(key.into(), executor);
    }

    /// The executor designated as primary.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Id of the plan created by the last `execute`.
    pub fn active_plan_id(&self) -> Option<&str> {
        self.active_plan_id.as_deref()
    }

    /// Create and activate the initial plan for a request.
    async fn create_initial_plan(&self, request: &str) -> Result<String> {
        let plan_id = format!("plan_{}", uuid::Uuid::new_v4().simple());
        let steps: Vec<&str> = INITIAL_STEPS.to_vec();

        let created = self
            .planning
            .execute(json!({
                "command": "create",
                "plan_id": plan_id,
                "title": format!("Plan for: {request}"),
                "steps": steps,
            }))
            .await
            .map_err(|e| Error::Flow(format!("failed to create plan: {e}")))?;
        if let Some(error) = created.error {
            return Err(Error::Flow(format!("failed to create plan: {error}")));
        }

        let activated = self
            .planning
            .execute(json!({"command": "set_active", "plan_id": plan_id}))
            .await
            .map_err(|e| Error::Flow(format!("failed to activate plan: {e}")))?;
        if let Some(error) = activated.error {
            return Err(Error::Flow(format!("failed to activate plan: {error}")));
        }

        Ok(plan_id)
    }

    /// First step still needing work: index, description, and type tag.
    ///
    /// Step-type inference is not implemented; every step carries the
    /// default tag and resolves to the primary executor.
    fn current_step_info(&self) -> Option<(usize, String, String)> {
        let plan = self.planning.active_plan()?;
        let index = plan.first_open_step()?;
        Some((
            index,
            plan.steps[index].description.clone(),
            "default".to_string(),
        ))
    }

    fn executor_key_for(&self, step_type: &str) -> String {
        if self.executors.contains_key(step_type) {
            step_type.to_string()
        } else {
            self.primary_key.clone()
        }
    }

    /// Record a step status; persistence failures are logged, not fatal.
    async fn mark_step(
        &self,
        index: usize,
        status: PlanStepStatus,
        result: Option<&str>,
        error: Option<&str>,
    ) {
        let mut args = json!({
            "command": "mark_step",
            "step_index": index,
            "status": status.as_str(),
        });
        if let Some(result) = result {
            args["result"] = json!(result);
        }
        if let Some(error) = error {
            args["error"] = json!(error);
        }

        match self.planning.execute(args).await {
            Ok(outcome) if !outcome.is_success() => {
                tracing::warn!(
                    step = index,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "failed to mark plan step"
                );
            }
            Err(e) => {
                tracing::warn!(step = index, error = %e, "failed to mark plan step");
            }
            Ok(_) => {}
        }
    }

    fn finalize(&self) -> String {
        match self.planning.active_plan() {
            Some(plan) => {
                let (completed, total) = plan.progress();
                format!("Plan execution completed. {completed}/{total} steps completed.")
            }
            None => "Plan execution completed.".to_string(),
        }
    }
}

#[async_trait]
impl Flow for PlanningFlow {
    async fn execute(&mut self, input: &str, cancel: &CancellationToken) -> Result<String> {
        tracing::info!(input, "starting planning flow");

        let plan_id = self.create_initial_plan(input).await?;
        self.active_plan_id = Some(plan_id);

        let mut report = String::new();
        loop {
            let Some((index, description, step_type)) = self.current_step_info() else {
                report.push_str(&self.finalize());
                break;
            };

            let key = self.executor_key_for(&step_type);
            if !self.executors.contains_key(&key) {
                report.push_str(&format!(
                    "Step {index}: No executor available for type {step_type}\n"
                ));
                break;
            }

            self.mark_step(index, PlanStepStatus::InProgress, None, None)
                .await;

            let run_result = {
                let executor = self
                    .executors
                    .get_mut(&key)
                    .expect("executor presence checked above");
                executor.run(&description, cancel).await
            };

            match run_result {
                Ok(step_result) => {
                    self.mark_step(index, PlanStepStatus::Completed, Some(&step_result), None)
                        .await;
                    report.push_str(&format!("Step {index}: {step_result}\n"));

                    let finished = self
                        .executors
                        .get(&key)
                        .is_some_and(|e| e.state() == AgentState::Finished);
                    if finished {
                        // A finished executor means the whole task is done,
                        // even if plan steps remain.
                        tracing::info!(executor = %key, "executor finished, ending flow early");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(step = index, error = %e, "step execution failed, aborting flow");
                    self.mark_step(index, PlanStepStatus::Blocked, None, Some(&e.to_string()))
                        .await;
                    report.push_str(&format!("Step {index} failed: {e}\n"));
                    break;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_tools::PlanStore;
    use tempfile::TempDir;

    /// Executor following a scripted sequence of outcomes.
    struct ScriptedExecutor {
        name: String,
        outcomes: Vec<Result<String>>,
        /// State reported after each run, matched by call index.
        states: Vec<AgentState>,
        calls: usize,
    }

    impl ScriptedExecutor {
        fn new(name: &str, outcomes: Vec<Result<String>>, states: Vec<AgentState>) -> Box<Self> {
            Box::new(Self {
                name: name.to_string(),
                outcomes,
                states,
                calls: 0,
            })
        }
    }

    #[async_trait]
    impl StepExecutor for ScriptedExecutor {
        fn name(&self) -> &str {
            &self.name
        }

        fn state(&self) -> AgentState {
            if self.calls == 0 {
                AgentState::Idle
            } else {
                self.states[self.calls - 1]
            }
        }

        async fn run(&mut self, _request: &str, _cancel: &CancellationToken) -> Result<String> {
            let index = self.calls;
            self.calls += 1;
            match &self.outcomes[index] {
                Ok(result) => Ok(result.clone()),
                Err(e) => Err(Error::Flow(e.to_string())),
            }
        }
    }

    fn flow_with(executor: Box<dyn StepExecutor>) -> (TempDir, PlanningFlow) {
        let tmp = TempDir::new().unwrap();
        let store = PlanStore::new(tmp.path().join("plans")).unwrap();
        let planning = PlanningTool::new(store).unwrap();
        let mut executors: HashMap<String, Box<dyn StepExecutor>> = HashMap::new();
        executors.insert("general".to_string(), executor);
        (tmp, PlanningFlow::new(executors, "general", planning))
    }

    #[tokio::test]
    async fn completes_all_steps_and_finalizes() {
        let executor = ScriptedExecutor::new(
            "general",
            vec![
                Ok("analyzed".into()),
                Ok("planned".into()),
                Ok("executed".into()),
                Ok("verified".into()),
            ],
            vec![AgentState::Running; 4],
        );
        let (_tmp, mut flow) = flow_with(executor);

        let report = flow.execute("ship the feature", &CancellationToken::new()).await.unwrap();

        assert!(report.contains("Step 0: analyzed"));
        assert!(report.contains("Step 3: verified"));
        assert!(report.contains("Plan execution completed. 4/4 steps completed."));

        let plan = flow.planning.active_plan().unwrap();
        assert!(plan
            .steps
            .iter()
            .all(|s| s.status == PlanStepStatus::Completed));
        assert_eq!(plan.steps[1].result.as_deref(), Some("planned"));
    }

    #[tokio::test]
    async fn finished_executor_ends_flow_early() {
        let executor = ScriptedExecutor::new(
            "general",
            vec![Ok("all done in one go".into())],
            vec![AgentState::Finished],
        );
        let (_tmp, mut flow) = flow_with(executor);

        let report = flow.execute("quick task", &CancellationToken::new()).await.unwrap();

        assert!(report.contains("Step 0: all done in one go"));
        // Early stop: no finalize summary, remaining steps untouched.
        assert!(!report.contains("Plan execution completed"));
        let plan = flow.planning.active_plan().unwrap();
        assert_eq!(plan.steps[0].status, PlanStepStatus::Completed);
        assert_eq!(plan.steps[1].status, PlanStepStatus::NotStarted);
    }

    #[tokio::test]
    async fn failed_step_is_blocked_and_aborts_the_flow() {
        let executor = ScriptedExecutor::new(
            "general",
            vec![
                Ok("analyzed".into()),
                Err(Error::Flow("executor crashed".into())),
            ],
            vec![AgentState::Running, AgentState::Error],
        );
        let (_tmp, mut flow) = flow_with(executor);

        let report = flow.execute("doomed task", &CancellationToken::new()).await.unwrap();

        assert!(report.contains("Step 0: analyzed"));
        assert!(report.contains("Step 1 failed:"));

        let plan = flow.planning.active_plan().unwrap();
        // Completed work stays recorded; the failing step is blocked with
        // the error text; later steps were never touched.
        assert_eq!(plan.steps[0].status, PlanStepStatus::Completed);
        assert_eq!(plan.steps[1].status, PlanStepStatus::Blocked);
        assert!(plan.steps[1].error.as_deref().unwrap().contains("executor crashed"));
        assert_eq!(plan.steps[2].status, PlanStepStatus::NotStarted);
    }

    #[tokio::test]
    async fn single_run_executor_blocks_second_step() {
        // A real agent executor has no reset path: after one run it is no
        // longer idle, so the second step it is handed fails admission.
        let executor = ScriptedExecutor::new(
            "general",
            vec![
                Ok("analyzed".into()),
                Err(Error::InvalidState(AgentState::Running)),
            ],
            vec![AgentState::Running, AgentState::Running],
        );
        let (_tmp, mut flow) = flow_with(executor);

        let report = flow.execute("long task", &CancellationToken::new()).await.unwrap();

        assert!(report.contains("Step 0: analyzed"));
        assert!(report.contains("Step 1 failed:"));
        let plan = flow.planning.active_plan().unwrap();
        assert_eq!(plan.steps[0].status, PlanStepStatus::Completed);
        assert_eq!(plan.steps[1].status, PlanStepStatus::Blocked);
    }

    #[tokio::test]
    async fn plan_record_is_persisted_across_reload() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("plans");
        let plan_id;

        {
            let planning = PlanningTool::new(PlanStore::new(&dir).unwrap()).unwrap();
            let mut executors: HashMap<String, Box<dyn StepExecutor>> = HashMap::new();
            executors.insert(
                "general".to_string(),
                ScriptedExecutor::new(
                    "general",
                    vec![Ok("done".into())],
                    vec![AgentState::Finished],
                ),
            );
            let mut flow = PlanningFlow::new(executors, "general", planning);
            flow.execute("persist me", &CancellationToken::new()).await.unwrap();
            plan_id = flow.active_plan_id().unwrap().to_string();
        }

        let reloaded = PlanningTool::new(PlanStore::new(&dir).unwrap()).unwrap();
        let plan = reloaded.plan(&plan_id).unwrap();
        assert_eq!(plan.title, "Plan for: persist me");
        assert_eq!(plan.steps[0].status, PlanStepStatus::Completed);
        assert_eq!(plan.steps[0].result.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn empty_primary_key_defaults_to_first_executor() {
        let tmp = TempDir::new().unwrap();
        let planning = PlanningTool::new(PlanStore::new(tmp.path().join("plans")).unwrap()).unwrap();
        let mut executors: HashMap<String, Box<dyn StepExecutor>> = HashMap::new();
        executors.insert(
            "alpha".to_string(),
            ScriptedExecutor::new("alpha", vec![], vec![]),
        );
        executors.insert(
            "beta".to_string(),
            ScriptedExecutor::new("beta", vec![], vec![]),
        );
        let flow = PlanningFlow::new(executors, "", planning);
        assert_eq!(flow.primary_key(), "alpha");
    }
}
