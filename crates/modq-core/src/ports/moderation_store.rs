//! ModerationStore port - moderation task の正本（source of truth）
//!
//! The worker never owns task records. It holds a `TaskId` and issues
//! updates; the store owns persistence. Updates are keyed by primary key with
//! no transaction around them, so at most one worker may own a task at a time
//! (partition assignment guarantees that).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ItemId, ModerationTask, StoreError, TaskId, TaskStatus, TaskUpdate};

#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Insert a new task and return it with its assigned id.
    async fn create(
        &self,
        item_id: ItemId,
        status: TaskStatus,
        created_at: DateTime<Utc>,
    ) -> Result<ModerationTask, StoreError>;

    /// Fetch a task. Missing → `StoreError::NotFound`.
    async fn get(&self, task_id: TaskId) -> Result<ModerationTask, StoreError>;

    /// Apply an update and return the stored task. Missing → `StoreError::NotFound`.
    async fn update(&self, task_id: TaskId, update: TaskUpdate) -> Result<ModerationTask, StoreError>;
}
