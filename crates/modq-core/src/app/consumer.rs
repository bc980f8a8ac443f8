//! ModerationConsumer - moderation topic の購読
//!
//! - fixed consumer group, manual commit only
//! - `earliest` for a group with no committed offset
//! - pull-based: the caller fetches one record, handles it fully (including
//!   `commit`) and only then fetches the next

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::TransportError;
use crate::ports::{ConsumedRecord, RecordSubscriber, Subscription};

pub struct ModerationConsumer {
    subscriber: Arc<dyn RecordSubscriber>,
    subscription: Subscription,
    started: Mutex<bool>,
}

impl ModerationConsumer {
    pub fn new(subscriber: Arc<dyn RecordSubscriber>, subscription: Subscription) -> Self {
        Self {
            subscriber,
            subscription,
            started: Mutex::new(false),
        }
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Join the group. No-op when already started.
    pub async fn start(&self) -> Result<(), TransportError> {
        let mut started = self.started.lock().await;
        if *started {
            return Ok(());
        }
        self.subscriber.subscribe(&self.subscription).await?;
        *started = true;
        info!(
            topic = %self.subscription.topic,
            group_id = %self.subscription.group_id,
            offset_reset = self.subscription.offset_reset.as_str(),
            "consumer started"
        );
        Ok(())
    }

    /// Leave the group. No-op when never started.
    ///
    /// Stays started when the unsubscribe fails, so `stop()` can be retried.
    pub async fn stop(&self) -> Result<(), TransportError> {
        let mut started = self.started.lock().await;
        if !*started {
            return Ok(());
        }
        self.subscriber.unsubscribe().await?;
        *started = false;
        info!(group_id = %self.subscription.group_id, "consumer stopped");
        Ok(())
    }

    /// Next record, or `None` once the stream has ended.
    pub async fn next(&self) -> Result<Option<ConsumedRecord>, TransportError> {
        if !*self.started.lock().await {
            return Err(TransportError::NotConnected);
        }
        self.subscriber.next_record().await
    }

    /// Advance the group's committed offset past `record`.
    pub async fn commit(&self, record: &ConsumedRecord) -> Result<(), TransportError> {
        self.subscriber.commit(record).await?;
        debug!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            "offset committed"
        );
        Ok(())
    }
}
