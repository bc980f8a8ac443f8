//! ModerationService - moderation task のライフサイクル操作
//!
//! Request side: `submit` creates a pending task and enqueues it, `result`
//! reads it back. Worker side: `complete_task` / `fail_task` are the only
//! writers of terminal states.

use std::sync::Arc;

use tracing::{info, warn};

use super::producer::ModerationProducer;
use crate::domain::{
    ItemId, ModerationError, ModerationResult, ModerationTask, Prediction, PredictionError,
    StoreError, TaskId, TaskStatus, TaskUpdate,
};
use crate::ports::{AdvertisementCatalog, Clock, ModerationStore};

pub struct ModerationService {
    store: Arc<dyn ModerationStore>,
    catalog: Arc<dyn AdvertisementCatalog>,
    producer: Arc<ModerationProducer>,
    clock: Arc<dyn Clock>,
}

impl ModerationService {
    pub fn new(
        store: Arc<dyn ModerationStore>,
        catalog: Arc<dyn AdvertisementCatalog>,
        producer: Arc<ModerationProducer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            producer,
            clock,
        }
    }

    /// Create a pending task for `item_id` and enqueue a moderation request.
    ///
    /// The task's `created_at` and the message timestamp are the same instant.
    pub async fn submit(&self, item_id: ItemId) -> Result<TaskId, ModerationError> {
        info!(item_id = %item_id, "moderation requested");

        if self.catalog.get(item_id).await?.is_none() {
            return Err(PredictionError::NotFound(item_id).into());
        }

        let now = self.clock.now();
        let task = self.store.create(item_id, TaskStatus::Pending, now).await?;

        if let Err(e) = self.producer.send_moderation_request(task.id, item_id, now).await {
            warn!(task_id = %task.id, error = %e, "task created but request was not enqueued");
            return Err(e.into());
        }
        Ok(task.id)
    }

    pub async fn result(&self, task_id: TaskId) -> Result<ModerationResult, ModerationError> {
        let task = self.store.get(task_id).await?;
        Ok(ModerationResult::from(&task))
    }

    pub async fn complete_task(
        &self,
        task_id: TaskId,
        prediction: Prediction,
    ) -> Result<ModerationTask, StoreError> {
        let update = TaskUpdate::Completed {
            prediction,
            processed_at: self.clock.now(),
        };
        self.store.update(task_id, update).await
    }

    pub async fn fail_task(
        &self,
        task_id: TaskId,
        error_message: impl Into<String>,
    ) -> Result<ModerationTask, StoreError> {
        let update = TaskUpdate::Failed {
            error_message: error_message.into(),
            processed_at: self.clock.now(),
        };
        self.store.update(task_id, update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::TopicNames;
    use crate::domain::{Advertisement, ErrorKind, ModerationRequestMessage, SellerId};
    use crate::impls::{InMemoryBroker, InMemoryCatalog, InMemoryModerationStore};
    use crate::ports::FixedClock;
    use chrono::{DateTime, TimeZone, Utc};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    struct Fixture {
        broker: InMemoryBroker,
        service: ModerationService,
    }

    async fn fixture() -> Fixture {
        let broker = InMemoryBroker::new();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(at()));
        let catalog = InMemoryCatalog::new();
        catalog
            .insert(Advertisement {
                item_id: ItemId::new(5),
                seller_id: SellerId::new(1),
                is_verified_seller: true,
                name: "chair".to_string(),
                description: "wooden chair".to_string(),
                category: 3,
                images_qty: 2,
            })
            .await;
        let producer = Arc::new(ModerationProducer::new(
            Arc::new(broker.publisher()),
            TopicNames {
                moderation: "moderation".to_string(),
                dead_letter: "moderation_dlq".to_string(),
            },
            clock.clone(),
        ));
        let service = ModerationService::new(
            Arc::new(InMemoryModerationStore::new()),
            Arc::new(catalog),
            producer,
            clock,
        );
        Fixture { broker, service }
    }

    #[tokio::test]
    async fn submit_creates_pending_task_and_enqueues_request() {
        let f = fixture().await;

        let task_id = f.service.submit(ItemId::new(5)).await.unwrap();

        let result = f.service.result(task_id).await.unwrap();
        assert_eq!(result.status, TaskStatus::Pending);
        assert_eq!(result.is_violation, None);

        let records = f.broker.records("moderation").await;
        assert_eq!(records.len(), 1);
        let message = ModerationRequestMessage::decode(&records[0]).unwrap();
        assert_eq!(message, ModerationRequestMessage::new(task_id, ItemId::new(5), at()));
    }

    #[tokio::test]
    async fn submit_for_unknown_item_is_not_found() {
        let f = fixture().await;
        let err = f.service.submit(ItemId::new(999)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(f.broker.records("moderation").await.is_empty());
    }

    #[tokio::test]
    async fn result_for_unknown_task_is_not_found() {
        let f = fixture().await;
        let err = f.service.result(TaskId::new(42)).await.unwrap_err();
        assert!(matches!(err, ModerationError::Store(StoreError::NotFound(id)) if id == TaskId::new(42)));
    }

    #[tokio::test]
    async fn complete_and_fail_stamp_processed_at() {
        let f = fixture().await;
        let first = f.service.submit(ItemId::new(5)).await.unwrap();
        let second = f.service.submit(ItemId::new(5)).await.unwrap();

        let done = f
            .service
            .complete_task(first, Prediction::new(true, 0.95).unwrap())
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.probability, Some(0.95));
        assert_eq!(done.processed_at, Some(at()));

        let failed = f.service.fail_task(second, "scoring backend unavailable").await.unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("scoring backend unavailable"));
        assert_eq!(failed.processed_at, Some(at()));
    }
}
