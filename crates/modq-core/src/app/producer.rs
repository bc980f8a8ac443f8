//! ModerationProducer - moderation request と dead-letter の送信
//!
//! Every send waits for the broker acknowledgement, which gives at-least-once
//! delivery. The underlying publisher is connected lazily on first send if
//! `start()` was never called.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::config::TopicNames;
use crate::domain::{DeadLetterMessage, ItemId, ModerationRequestMessage, TaskId, TransportError};
use crate::ports::{Clock, RecordPosition, RecordPublisher};

pub struct ModerationProducer {
    publisher: Arc<dyn RecordPublisher>,
    topics: TopicNames,
    clock: Arc<dyn Clock>,
    started: Mutex<bool>,
}

impl ModerationProducer {
    pub fn new(publisher: Arc<dyn RecordPublisher>, topics: TopicNames, clock: Arc<dyn Clock>) -> Self {
        Self {
            publisher,
            topics,
            clock,
            started: Mutex::new(false),
        }
    }

    pub fn topics(&self) -> &TopicNames {
        &self.topics
    }

    /// Connect the publisher. No-op when already started.
    pub async fn start(&self) -> Result<(), TransportError> {
        let mut started = self.started.lock().await;
        if *started {
            return Ok(());
        }
        self.publisher.connect().await?;
        *started = true;
        info!(
            moderation_topic = %self.topics.moderation,
            dlq_topic = %self.topics.dead_letter,
            "producer started"
        );
        Ok(())
    }

    /// Flush and disconnect. No-op when never started.
    ///
    /// Stays started when the disconnect fails, so `stop()` can be retried.
    pub async fn stop(&self) -> Result<(), TransportError> {
        let mut started = self.started.lock().await;
        if !*started {
            return Ok(());
        }
        self.publisher.disconnect().await?;
        *started = false;
        info!("producer stopped");
        Ok(())
    }

    pub async fn is_started(&self) -> bool {
        *self.started.lock().await
    }

    /// Publish a moderation request for `task_id`/`item_id`.
    pub async fn send_moderation_request(
        &self,
        task_id: TaskId,
        item_id: ItemId,
        timestamp: DateTime<Utc>,
    ) -> Result<RecordPosition, TransportError> {
        let payload = ModerationRequestMessage::new(task_id, item_id, timestamp).encode()?;
        let position = self.publish(&self.topics.moderation, &payload).await?;
        debug!(
            task_id = %task_id,
            item_id = %item_id,
            partition = position.partition,
            offset = position.offset,
            "moderation request enqueued"
        );
        Ok(position)
    }

    /// Stamp the current time and publish a dead-letter record.
    pub async fn send_to_dlq(
        &self,
        original_message: &str,
        error: &str,
        retry_count: u32,
    ) -> Result<RecordPosition, TransportError> {
        let message = DeadLetterMessage::new(original_message, error, retry_count, self.clock.now());
        let payload = message.encode()?;
        let position = self.publish(&self.topics.dead_letter, &payload).await?;
        info!(
            error = %error,
            retry_count,
            topic = %self.topics.dead_letter,
            offset = position.offset,
            "message dead-lettered"
        );
        Ok(position)
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<RecordPosition, TransportError> {
        self.start().await?;
        self.publisher.publish(topic, payload).await
    }
}
