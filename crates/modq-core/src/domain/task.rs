//! Moderation task record and the updates the worker may apply to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ItemId, TaskId};
use super::prediction::Prediction;

/// Task status.
///
/// State transitions:
/// - Pending -> Completed
/// - Pending -> Failed
///
/// Nothing ever moves a task back to Pending: [`TaskUpdate`] has no variant for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted lifecycle of one moderation decision. Owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationTask {
    pub id: TaskId,
    pub item_id: ItemId,
    pub status: TaskStatus,
    pub is_violation: Option<bool>,
    pub probability: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl ModerationTask {
    pub fn new(id: TaskId, item_id: ItemId, status: TaskStatus, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            item_id,
            status,
            is_violation: None,
            probability: None,
            error_message: None,
            created_at,
            processed_at: None,
        }
    }

    pub fn apply(&mut self, update: TaskUpdate) {
        match update {
            TaskUpdate::Completed {
                prediction,
                processed_at,
            } => {
                self.status = TaskStatus::Completed;
                self.is_violation = Some(prediction.is_violation);
                self.probability = Some(prediction.probability);
                self.processed_at = Some(processed_at);
            }
            TaskUpdate::Failed {
                error_message,
                processed_at,
            } => {
                self.status = TaskStatus::Failed;
                self.error_message = Some(error_message);
                self.processed_at = Some(processed_at);
            }
        }
    }
}

/// Field changes the worker issues against a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    Completed {
        prediction: Prediction,
        processed_at: DateTime<Utc>,
    },
    Failed {
        error_message: String,
        processed_at: DateTime<Utc>,
    },
}

impl TaskUpdate {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskUpdate::Completed { .. } => TaskStatus::Completed,
            TaskUpdate::Failed { .. } => TaskStatus::Failed,
        }
    }
}

/// Read-side view of a task: `{task_id, status, is_violation, probability}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub is_violation: Option<bool>,
    pub probability: Option<f64>,
}

impl From<&ModerationTask> for ModerationResult {
    fn from(task: &ModerationTask) -> Self {
        Self {
            task_id: task.id,
            status: task.status,
            is_violation: task.is_violation,
            probability: task.probability,
        }
    }
}
