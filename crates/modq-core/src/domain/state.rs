//! Per-message processing state and the terminal outcome of a pass.

use std::fmt;

use super::errors::ErrorKind;
use super::ids::TaskId;
use super::prediction::Prediction;
use super::task::TaskStatus;

/// Where a message is in the worker.
///
/// # 状態遷移
/// - RECEIVED -> PREDICTING -> COMPLETED
/// - RECEIVED -> PREDICTING -> RETRYING -> ... -> COMPLETED | DEAD_LETTERED
///
/// Terminal: COMPLETED, DEAD_LETTERED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    Received,
    Predicting,
    Retrying { retry_count: u32 },
    Completed,
    DeadLettered,
}

impl ProcessingState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingState::Completed | ProcessingState::DeadLettered)
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingState::Received => f.write_str("RECEIVED"),
            ProcessingState::Predicting => f.write_str("PREDICTING"),
            ProcessingState::Retrying { retry_count } => write!(f, "RETRYING({retry_count})"),
            ProcessingState::Completed => f.write_str("COMPLETED"),
            ProcessingState::DeadLettered => f.write_str("DEAD_LETTERED"),
        }
    }
}

/// How a single message left the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Task marked completed. `attempts` counts the initial try.
    Completed {
        task_id: TaskId,
        prediction: Prediction,
        attempts: u32,
    },

    /// Budget exhausted: dead-letter record sent and task marked failed.
    DeadLettered {
        task_id: TaskId,
        kind: ErrorKind,
        retry_count: u32,
    },

    /// Payload could not be decoded; dead-lettered without touching any task.
    Rejected,

    /// Redelivered request for a task that already reached `status`.
    /// Nothing is predicted, written or dead-lettered.
    AlreadyHandled { task_id: TaskId, status: TaskStatus },
}

impl ProcessOutcome {
    pub fn state(&self) -> ProcessingState {
        match self {
            ProcessOutcome::Completed { .. } => ProcessingState::Completed,
            ProcessOutcome::DeadLettered { .. } | ProcessOutcome::Rejected => {
                ProcessingState::DeadLettered
            }
            ProcessOutcome::AlreadyHandled { status, .. } => match status {
                TaskStatus::Completed => ProcessingState::Completed,
                _ => ProcessingState::DeadLettered,
            },
        }
    }
}
