//! Inference task models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task lifecycle state
///
/// `Submitted` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Submitted,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Submitted)
    }

    /// Progress percentage reported to pollers
    pub fn progress(self) -> u8 {
        if self.is_terminal() {
            100
        } else {
            0
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Submitted => "submitted",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// An inference task created through this gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub model_name: String,
    pub prompt: String,
    pub status: TaskStatus,
    /// Node chosen when the task was created
    pub assigned_client: String,
    /// Response text on completion, error text on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn progress(&self) -> u8 {
        self.status.progress()
    }
}
