//! Plan tracking and persistence.
//!
//! A plan is an ordered list of steps with a status lifecycle
//! (`not_started -> in_progress -> completed | blocked`). Every mutation is
//! persisted as one pretty-printed JSON record per plan id in a directory
//! store; all existing records are loaded eagerly at startup.
//!
//! `PlanningTool` exposes plan management to the model as a regular tool
//! (`create`, `update`, `list`, `get`, `set_active`, `mark_step`, `delete`)
//! and to the planning flow through the same command surface.

use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use axon_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Status of a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepStatus {
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

impl PlanStepStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
        }
    }

    /// Parse a wire-format status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    /// Whether the step still needs work.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::NotStarted | Self::InProgress)
    }

    /// Checklist mark used when rendering a plan.
    pub const fn mark(self) -> &'static str {
        match self {
            Self::Completed => "[✓]",
            Self::InProgress => "[→]",
            Self::Blocked => "[!]",
            Self::NotStarted => "[ ]",
        }
    }
}

impl std::fmt::Display for PlanStepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
    pub status: PlanStepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanStep {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: PlanStepStatus::NotStarted,
            result: None,
            error: None,
        }
    }
}

/// An ordered multi-step plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub title: String,
    pub steps: Vec<PlanStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Plan {
    /// Create a plan with all steps not started.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        step_descriptions: impl IntoIterator<Item = String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            steps: step_descriptions.into_iter().map(PlanStep::new).collect(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    /// Index of the first step that is not started or in progress.
    pub fn first_open_step(&self) -> Option<usize> {
        self.steps.iter().position(|s| s.status.is_open())
    }

    /// Completed and total step counts.
    pub fn progress(&self) -> (usize, usize) {
        let completed = self
            .steps
            .iter()
            .filter(|s| s.status == PlanStepStatus::Completed)
            .count();
        (completed, self.steps.len())
    }

    /// Render the plan as a human-readable checklist.
    pub fn render(&self) -> String {
        let mut out = format!("Plan: {}\n", self.title);
        out.push_str(&format!("ID: {}\n", self.id));
        out.push_str(&format!(
            "Created: {}\n",
            self.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!(
            "Updated: {}\n",
            self.updated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("Steps ({}):\n", self.steps.len()));
        for (i, step) in self.steps.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {} {}\n",
                i + 1,
                step.status.mark(),
                step.description
            ));
            if let Some(result) = &step.result {
                out.push_str(&format!("     Result: {result}\n"));
            }
            if let Some(error) = &step.error {
                out.push_str(&format!("     Error: {error}\n"));
            }
        }
        out
    }
}

/// Directory-backed store of plan records.
///
/// One JSON document per plan id, named `{id}.json`.
pub struct PlanStore {
    dir: PathBuf,
}

impl PlanStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Load every record in the store. Unreadable records are skipped.
    pub fn load_all(&self) -> Result<HashMap<String, Plan>> {
        let mut plans = HashMap::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(data) => match serde_json::from_str::<Plan>(&data) {
                    Ok(plan) => {
                        plans.insert(plan.id.clone(), plan);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable plan record");
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable plan record");
                }
            }
        }
        Ok(plans)
    }

    /// Persist one plan record.
    pub fn save(&self, plan: &Plan) -> Result<()> {
        let data = serde_json::to_string_pretty(plan)?;
        fs::write(self.record_path(&plan.id), data)?;
        Ok(())
    }

    /// Remove a plan record, if present.
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.record_path(id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

struct PlanBook {
    plans: HashMap<String, Plan>,
    active: Option<String>,
}

/// Plan management tool.
///
/// Holds the in-memory plan set plus the store; every mutating command
/// saves the touched plan before returning.
pub struct PlanningTool {
    book: Mutex<PlanBook>,
    store: PlanStore,
}

impl PlanningTool {
    /// Create the tool, eagerly loading all existing records.
    pub fn new(store: PlanStore) -> Result<Self> {
        let plans = store.load_all()?;
        Ok(Self {
            book: Mutex::new(PlanBook {
                plans,
                active: None,
            }),
            store,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, PlanBook>> {
        self.book
            .lock()
            .map_err(|e| Error::Internal(format!("plan lock poisoned: {e}")))
    }

    /// The currently active plan, if one is set.
    pub fn active_plan(&self) -> Option<Plan> {
        let book = self.book.lock().ok()?;
        book.active
            .as_ref()
            .and_then(|id| book.plans.get(id))
            .cloned()
    }

    /// Look up a plan by id.
    pub fn plan(&self, id: &str) -> Option<Plan> {
        let book = self.book.lock().ok()?;
        book.plans.get(id).cloned()
    }

    fn create(&self, args: &serde_json::Value) -> Result<ToolResult> {
        let Some(id) = str_arg(args, "plan_id") else {
            return Ok(ToolResult::failure("plan_id is required for create command"));
        };
        let Some(title) = str_arg(args, "title") else {
            return Ok(ToolResult::failure("title is required for create command"));
        };
        let steps = steps_arg(args);
        if steps.is_empty() {
            return Ok(ToolResult::failure("steps is required for create command"));
        }

        let mut book = self.lock()?;
        if book.plans.contains_key(id) {
            return Ok(ToolResult::failure(format!(
                "Plan with ID {id} already exists"
            )));
        }

        let plan = Plan::new(id, title, steps);
        let count = plan.steps.len();
        self.store.save(&plan)?;
        book.plans.insert(id.to_string(), plan);

        Ok(ToolResult::success(format!(
            "Plan '{title}' created successfully with {count} steps"
        )))
    }

    fn update(&self, args: &serde_json::Value) -> Result<ToolResult> {
        let Some(id) = str_arg(args, "plan_id") else {
            return Ok(ToolResult::failure("plan_id is required for update command"));
        };

        let mut book = self.lock()?;
        let Some(plan) = book.plans.get_mut(id) else {
            return Ok(ToolResult::failure(format!("Plan with ID {id} not found")));
        };

        if let Some(title) = str_arg(args, "title") {
            plan.title = title.to_string();
        }
        let steps = steps_arg(args);
        if !steps.is_empty() {
            plan.steps = steps.into_iter().map(PlanStep::new).collect();
        }
        plan.updated_at = Utc::now();
        self.store.save(plan)?;

        Ok(ToolResult::success(format!(
            "Plan '{id}' updated successfully"
        )))
    }

    fn list(&self) -> Result<ToolResult> {
        let book = self.lock()?;
        if book.plans.is_empty() {
            return Ok(ToolResult::success("No plans found"));
        }

        let mut ids: Vec<&String> = book.plans.keys().collect();
        ids.sort();

        let mut out = String::from("Available plans:\n");
        for id in ids {
            let plan = &book.plans[id];
            let status = if book.active.as_deref() == Some(id.as_str()) {
                "active"
            } else {
                "inactive"
            };
            out.push_str(&format!(
                "- {} ({}): {} [{} steps, {}]\n",
                id,
                status,
                plan.title,
                plan.steps.len(),
                plan.updated_at.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        Ok(ToolResult::success(out))
    }

    fn get(&self, args: &serde_json::Value) -> Result<ToolResult> {
        let book = self.lock()?;
        let id = match str_arg(args, "plan_id") {
            Some(id) => id.to_string(),
            None => match &book.active {
                Some(active) => active.clone(),
                None => {
                    return Ok(ToolResult::failure(
                        "No plan_id provided and no active plan set",
                    ));
                }
            },
        };

        match book.plans.get(&id) {
            Some(plan) => Ok(ToolResult::success(plan.render())),
            None => Ok(ToolResult::failure(format!("Plan with ID {id} not found"))),
        }
    }

    fn set_active(&self, args: &serde_json::Value) -> Result<ToolResult> {
        let Some(id) = str_arg(args, "plan_id") else {
            return Ok(ToolResult::failure(
                "plan_id is required for set_active command",
            ));
        };

        let mut book = self.lock()?;
        if !book.plans.contains_key(id) {
            return Ok(ToolResult::failure(format!("Plan with ID {id} not found")));
        }
        book.active = Some(id.to_string());
        Ok(ToolResult::success(format!("Plan '{id}' set as active")))
    }

    fn mark_step(&self, args: &serde_json::Value) -> Result<ToolResult> {
        let mut book = self.lock()?;
        let id = match str_arg(args, "plan_id") {
            Some(id) => id.to_string(),
            None => match &book.active {
                Some(active) => active.clone(),
                None => {
                    return Ok(ToolResult::failure(
                        "No plan_id provided and no active plan set",
                    ));
                }
            },
        };

        let Some(index) = args.get("step_index").and_then(serde_json::Value::as_u64) else {
            return Ok(ToolResult::failure(
                "step_index is required for mark_step command",
            ));
        };
        let Some(status_str) = str_arg(args, "status") else {
            return Ok(ToolResult::failure("status is required for mark_step command"));
        };
        let Some(status) = PlanStepStatus::parse(status_str) else {
            return Ok(ToolResult::failure(format!("Invalid status: {status_str}")));
        };

        let Some(plan) = book.plans.get_mut(&id) else {
            return Ok(ToolResult::failure(format!("Plan with ID {id} not found")));
        };

        let index = index as usize;
        if index >= plan.steps.len() {
            return Ok(ToolResult::failure(format!(
                "Invalid step_index: {index} (plan has {} steps)",
                plan.steps.len()
            )));
        }

        plan.steps[index].status = status;
        if let Some(result) = str_arg(args, "result") {
            plan.steps[index].result = Some(result.to_string());
        }
        if let Some(error) = str_arg(args, "error") {
            plan.steps[index].error = Some(error.to_string());
        }
        plan.updated_at = Utc::now();
        self.store.save(plan)?;

        Ok(ToolResult::success(format!(
            "Step {} marked as {status}",
            index + 1
        )))
    }

    fn delete(&self, args: &serde_json::Value) -> Result<ToolResult> {
        let Some(id) = str_arg(args, "plan_id") else {
            return Ok(ToolResult::failure("plan_id is required for delete command"));
        };

        let mut book = self.lock()?;
        if book.plans.remove(id).is_none() {
            return Ok(ToolResult::failure(format!("Plan with ID {id} not found")));
        }
        if book.active.as_deref() == Some(id) {
            book.active = None;
        }
        self.store.delete(id)?;

        Ok(ToolResult::success(format!(
            "Plan '{id}' deleted successfully"
        )))
    }
}

fn str_arg<'a>(args: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

fn steps_arg(args: &serde_json::Value) -> Vec<String> {
    args.get("steps")
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Tool for PlanningTool {
    fn name(&self) -> &str {
        "planning"
    }

    fn description(&self) -> &str {
        "A planning tool that allows the agent to create and manage plans for solving complex tasks.\n\
         The tool provides functionality for creating plans, updating plan steps, and tracking progress."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "description": "The command to execute. Available commands: create, update, list, get, set_active, mark_step, delete.",
                    "enum": ["create", "update", "list", "get", "set_active", "mark_step", "delete"],
                    "type": "string"
                },
                "plan_id": {
                    "description": "Unique identifier for the plan. Required for create, update, set_active, and delete commands. Optional for get and mark_step (uses active plan if not specified).",
                    "type": "string"
                },
                "title": {
                    "description": "Title for the plan. Required for create command, optional for update command.",
                    "type": "string"
                },
                "steps": {
                    "description": "List of plan steps. Required for create command, optional for update command.",
                    "type": "array",
                    "items": {"type": "string"}
                },
                "step_index": {
                    "description": "Index of the step to mark (0-based). Required for mark_step command.",
                    "type": "integer"
                },
                "status": {
                    "description": "Status to set for the step. Required for mark_step command.",
                    "enum": ["not_started", "in_progress", "completed", "blocked"],
                    "type": "string"
                },
                "result": {
                    "description": "Result text for the step. Optional for mark_step command.",
                    "type": "string"
                },
                "error": {
                    "description": "Error text for the step. Optional for mark_step command.",
                    "type": "string"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let Some(command) = str_arg(&args, "command") else {
            return Ok(ToolResult::failure("command parameter is required"));
        };

        let result = match command {
            "create" => self.create(&args)?,
            "update" => self.update(&args)?,
            "list" => self.list()?,
            "get" => self.get(&args)?,
            "set_active" => self.set_active(&args)?,
            "mark_step" => self.mark_step(&args)?,
            "delete" => self.delete(&args)?,
            other => ToolResult::failure(format!("Unknown command: {other}")),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_tool() -> (TempDir, PlanningTool) {
        let tmp = TempDir::new().unwrap();
        let store = PlanStore::new(tmp.path().join("plans")).unwrap();
        let tool = PlanningTool::new(store).unwrap();
        (tmp, tool)
    }

    async fn run(tool: &PlanningTool, args: serde_json::Value) -> ToolResult {
        tool.execute(args).await.unwrap()
    }

    #[tokio::test]
    async fn create_and_get() {
        let (_tmp, tool) = temp_tool();
        let result = run(
            &tool,
            serde_json::json!({
                "command": "create",
                "plan_id": "p1",
                "title": "Ship it",
                "steps": ["a", "b", "c"]
            }),
        )
        .await;
        assert!(result.is_success(), "{result:?}");
        assert!(result.output.contains("3 steps"));

        let rendered = run(&tool, serde_json::json!({"command": "get", "plan_id": "p1"})).await;
        assert!(rendered.output.contains("Plan: Ship it"));
        assert!(rendered.output.contains("1. [ ] a"));
    }

    #[tokio::test]
    async fn create_duplicate_rejected() {
        let (_tmp, tool) = temp_tool();
        let args = serde_json::json!({
            "command": "create", "plan_id": "p1", "title": "t", "steps": ["a"]
        });
        run(&tool, args.clone()).await;
        let result = run(&tool, args).await;
        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("already exists"));
    }

    #[tokio::test]
    async fn mark_step_round_trips_through_store() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("plans");

        {
            let tool = PlanningTool::new(PlanStore::new(&dir).unwrap()).unwrap();
            run(
                &tool,
                serde_json::json!({
                    "command": "create", "plan_id": "p1", "title": "t",
                    "steps": ["a", "b", "c"]
                }),
            )
            .await;
            let result = run(
                &tool,
                serde_json::json!({
                    "command": "mark_step", "plan_id": "p1",
                    "step_index": 0, "status": "completed", "result": "r"
                }),
            )
            .await;
            assert!(result.is_success(), "{result:?}");
            assert_eq!(result.output, "Step 1 marked as completed");
        }

        // Reload from disk: the mutation survived, other steps untouched.
        let tool = PlanningTool::new(PlanStore::new(&dir).unwrap()).unwrap();
        let plan = tool.plan("p1").unwrap();
        assert_eq!(plan.steps[0].status, PlanStepStatus::Completed);
        assert_eq!(plan.steps[0].result.as_deref(), Some("r"));
        assert_eq!(plan.steps[1].status, PlanStepStatus::NotStarted);
        assert_eq!(plan.steps[2].status, PlanStepStatus::NotStarted);
        assert!(plan.steps[1].result.is_none());
    }

    #[tokio::test]
    async fn mark_step_uses_active_plan() {
        let (_tmp, tool) = temp_tool();
        run(
            &tool,
            serde_json::json!({
                "command": "create", "plan_id": "p1", "title": "t", "steps": ["a"]
            }),
        )
        .await;
        run(&tool, serde_json::json!({"command": "set_active", "plan_id": "p1"})).await;

        let result = run(
            &tool,
            serde_json::json!({
                "command": "mark_step", "step_index": 0, "status": "in_progress"
            }),
        )
        .await;
        assert!(result.is_success());
        assert_eq!(
            tool.active_plan().unwrap().steps[0].status,
            PlanStepStatus::InProgress
        );
    }

    #[tokio::test]
    async fn mark_step_rejects_bad_input() {
        let (_tmp, tool) = temp_tool();
        run(
            &tool,
            serde_json::json!({
                "command": "create", "plan_id": "p1", "title": "t", "steps": ["a"]
            }),
        )
        .await;

        let result = run(
            &tool,
            serde_json::json!({
                "command": "mark_step", "plan_id": "p1", "step_index": 5, "status": "completed"
            }),
        )
        .await;
        assert!(result.error.unwrap().contains("Invalid step_index"));

        let result = run(
            &tool,
            serde_json::json!({
                "command": "mark_step", "plan_id": "p1", "step_index": 0, "status": "done"
            }),
        )
        .await;
        assert!(result.error.unwrap().contains("Invalid status"));
    }

    #[tokio::test]
    async fn delete_removes_record_and_active() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("plans");
        let tool = PlanningTool::new(PlanStore::new(&dir).unwrap()).unwrap();
        run(
            &tool,
            serde_json::json!({
                "command": "create", "plan_id": "p1", "title": "t", "steps": ["a"]
            }),
        )
        .await;
        run(&tool, serde_json::json!({"command": "set_active", "plan_id": "p1"})).await;
        assert!(dir.join("p1.json").exists());

        let result = run(&tool, serde_json::json!({"command": "delete", "plan_id": "p1"})).await;
        assert!(result.is_success());
        assert!(!dir.join("p1.json").exists());
        assert!(tool.active_plan().is_none());
    }

    #[tokio::test]
    async fn list_marks_active_plan() {
        let (_tmp, tool) = temp_tool();
        for id in ["p1", "p2"] {
            run(
                &tool,
                serde_json::json!({
                    "command": "create", "plan_id": id, "title": "t", "steps": ["a"]
                }),
            )
            .await;
        }
        run(&tool, serde_json::json!({"command": "set_active", "plan_id": "p2"})).await;

        let result = run(&tool, serde_json::json!({"command": "list"})).await;
        assert!(result.output.contains("- p1 (inactive)"));
        assert!(result.output.contains("- p2 (active)"));
    }

    #[tokio::test]
    async fn unknown_command_is_nonfatal() {
        let (_tmp, tool) = temp_tool();
        let result = run(&tool, serde_json::json!({"command": "bogus"})).await;
        assert_eq!(result.error.as_deref(), Some("Unknown command: bogus"));
    }

    #[test]
    fn first_open_step_scans_in_order() {
        let mut plan = Plan::new("p", "t", vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(plan.first_open_step(), Some(0));
        plan.steps[0].status = PlanStepStatus::Completed;
        plan.steps[1].status = PlanStepStatus::InProgress;
        assert_eq!(plan.first_open_step(), Some(1));
        plan.steps[1].status = PlanStepStatus::Blocked;
        plan.steps[2].status = PlanStepStatus::Completed;
        assert_eq!(plan.first_open_step(), None);
        assert_eq!(plan.progress(), (2, 3));
    }

    #[test]
    fn store_skips_unreadable_records() {
        let tmp = TempDir::new().unwrap();
        let store = PlanStore::new(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("bad.json"), "not a plan").unwrap();
        store.save(&Plan::new("good", "t", vec!["a".into()])).unwrap();

        let plans = store.load_all().unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans.contains_key("good"));
    }
}
