//! In-memory task tracking.
//!
//! Correlates a task poll with the earlier create call. Nothing is
//! persisted: tasks live as long as the tracker.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{GatewayError, GatewayResult};
use crate::ids::generate_id;
use crate::models::{Task, TaskStatus};

/// Prefix of generated task identifiers
pub const TASK_ID_PREFIX: &str = "task";

/// Assigned-client name used when no live registry lookup is available
pub fn fallback_client(model_name: &str) -> String {
    format!("client_for_{}", model_name)
}

/// Tracks inference tasks by opaque identifier
#[derive(Debug, Default)]
pub struct TaskTracker {
    tasks: RwLock<HashMap<String, Task>>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task in the `submitted` state.
    ///
    /// `assigned_client` is the node picked by a registry lookup; `None`
    /// falls back to the `client_for_<model>` naming convention.
    pub fn create(
        &self,
        model_name: &str,
        prompt: &str,
        assigned_client: Option<String>,
    ) -> Task {
        let task = Task {
            task_id: generate_id(TASK_ID_PREFIX),
            model_name: model_name.to_string(),
            prompt: prompt.to_string(),
            status: TaskStatus::Submitted,
            assigned_client: assigned_client.unwrap_or_else(|| fallback_client(model_name)),
            result: None,
            created_at: Utc::now(),
            finished_at: None,
        };

        info!(
            task_id = %task.task_id,
            model = %task.model_name,
            assigned_client = %task.assigned_client,
            "Task created"
        );

        self.tasks
            .write()
            .insert(task.task_id.clone(), task.clone());

        task
    }

    /// Look up a task
    pub fn status(&self, task_id: &str) -> GatewayResult<Task> {
        self.tasks
            .read()
            .get(task_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("Task not found: {}", task_id)))
    }

    /// Move a submitted task to `completed`
    pub fn complete(&self, task_id: &str, result: impl Into<String>) -> GatewayResult<Task> {
        self.finish(task_id, TaskStatus::Completed, result.into())
    }

    /// Move a submitted task to `failed`
    pub fn fail(&self, task_id: &str, error: impl Into<String>) -> GatewayResult<Task> {
        self.finish(task_id, TaskStatus::Failed, error.into())
    }

    fn finish(&self, task_id: &str, to: TaskStatus, result: String) -> GatewayResult<Task> {
        let mut tasks = self.tasks.write();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| GatewayError::NotFound(format!("Task not found: {}", task_id)))?;

        if task.status.is_terminal() {
            return Err(GatewayError::InvalidRequest(format!(
                "Task {} is already {}, cannot move to {}",
                task_id, task.status, to
            )));
        }

        task.status = to;
        task.result = Some(result);
        task.finished_at = Some(Utc::now());
        debug!(task_id = %task_id, status = %to, "Task finished");

        Ok(task.clone())
    }

    /// `(submitted, completed)` task counts
    pub fn counts(&self) -> (usize, usize) {
        let tasks = self.tasks.read();
        let active = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Submitted)
            .count();
        let completed = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        (active, completed)
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}
