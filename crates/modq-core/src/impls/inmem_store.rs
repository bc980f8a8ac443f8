//! InMemoryModerationStore - テスト用の正本
//!
//! - id は 1 から採番
//! - task ごとに status の遷移履歴を保持（単調性の検証用）
//! - `fail_next_updates(n)` で store 障害を注入できる

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{ItemId, ModerationTask, StoreError, TaskId, TaskStatus, TaskUpdate};
use crate::ports::ModerationStore;

#[derive(Default)]
struct StoreState {
    next_id: u64,
    tasks: HashMap<TaskId, ModerationTask>,
    history: HashMap<TaskId, Vec<TaskStatus>>,
    failing_updates: usize,
}

#[derive(Default)]
pub struct InMemoryModerationStore {
    state: Mutex<StoreState>,
}

impl InMemoryModerationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status the task has been written with, oldest first.
    pub async fn history(&self, task_id: TaskId) -> Vec<TaskStatus> {
        self.state
            .lock()
            .await
            .history
            .get(&task_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The next `count` updates fail with `StoreError::Backend`.
    pub async fn fail_next_updates(&self, count: usize) {
        self.state.lock().await.failing_updates = count;
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ModerationStore for InMemoryModerationStore {
    async fn create(
        &self,
        item_id: ItemId,
        status: TaskStatus,
        created_at: DateTime<Utc>,
    ) -> Result<ModerationTask, StoreError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = TaskId::new(state.next_id);

        let task = ModerationTask::new(id, item_id, status, created_at);
        state.tasks.insert(id, task.clone());
        state.history.insert(id, vec![status]);
        Ok(task)
    }

    async fn get(&self, task_id: TaskId) -> Result<ModerationTask, StoreError> {
        self.state
            .lock()
            .await
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(StoreError::NotFound(task_id))
    }

    async fn update(&self, task_id: TaskId, update: TaskUpdate) -> Result<ModerationTask, StoreError> {
        let mut state = self.state.lock().await;
        if state.failing_updates > 0 {
            state.failing_updates -= 1;
            return Err(StoreError::Backend("injected update failure".to_string()));
        }

        let status = update.status();
        let task = state.tasks.get_mut(&task_id).ok_or(StoreError::NotFound(task_id))?;
        task.apply(update);
        let task = task.clone();
        state.history.entry(task_id).or_default().push(status);
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Prediction;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn ids_start_at_one() {
        let store = InMemoryModerationStore::new();
        let a = store.create(ItemId::new(5), TaskStatus::Pending, at()).await.unwrap();
        let b = store.create(ItemId::new(6), TaskStatus::Pending, at()).await.unwrap();
        assert_eq!(a.id, TaskId::new(1));
        assert_eq!(b.id, TaskId::new(2));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn update_applies_and_records_history() {
        let store = InMemoryModerationStore::new();
        let task = store.create(ItemId::new(5), TaskStatus::Pending, at()).await.unwrap();

        let updated = store
            .update(
                task.id,
                TaskUpdate::Completed {
                    prediction: Prediction::new(false, 0.1).unwrap(),
                    processed_at: at(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(store.get(task.id).await.unwrap(), updated);
        assert_eq!(
            store.history(task.id).await,
            vec![TaskStatus::Pending, TaskStatus::Completed]
        );
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let store = InMemoryModerationStore::new();
        let err = store.get(TaskId::new(7)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == TaskId::new(7)));

        let err = store
            .update(
                TaskId::new(7),
                TaskUpdate::Failed {
                    error_message: "x".to_string(),
                    processed_at: at(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = InMemoryModerationStore::new();
        let task = store.create(ItemId::new(5), TaskStatus::Pending, at()).await.unwrap();
        store.fail_next_updates(1).await;

        let update = TaskUpdate::Failed {
            error_message: "x".to_string(),
            processed_at: at(),
        };
        assert!(matches!(
            store.update(task.id, update.clone()).await,
            Err(StoreError::Backend(_))
        ));
        assert!(store.update(task.id, update).await.is_ok());
    }
}
