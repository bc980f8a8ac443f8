//! Kafka transport (feature `kafka`)
//!
//! - `KafkaPublisher`: `FutureProducer`, `acks=all`, every send awaited until
//!   the broker acknowledges it
//! - `KafkaSubscriber`: `StreamConsumer`, `enable.auto.commit=false`,
//!   synchronous commit of `offset + 1` per record
//!
//! librdkafka の flush / sync commit はスレッドをブロックするので
//! `spawn_blocking` 上で実行する。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::{Message, Offset, TopicPartitionList};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::TransportError;
use crate::ports::{ConsumedRecord, RecordPosition, RecordPublisher, RecordSubscriber, Subscription};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct KafkaPublisher {
    brokers: String,
    producer: RwLock<Option<FutureProducer>>,
}

impl KafkaPublisher {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            producer: RwLock::new(None),
        }
    }
}

#[async_trait]
impl RecordPublisher for KafkaPublisher {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut slot = self.producer.write().await;
        if slot.is_some() {
            return Ok(());
        }

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("message.timeout.ms", "30000")
            .create()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        info!(brokers = %self.brokers, "kafka producer connected");
        *slot = Some(producer);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<RecordPosition, TransportError> {
        let producer = self
            .producer
            .read()
            .await
            .clone()
            .ok_or(TransportError::NotConnected)?;

        let record = FutureRecord::<(), [u8]>::to(topic).payload(payload);
        match producer.send(record, Timeout::After(SEND_TIMEOUT)).await {
            Ok((partition, offset)) => Ok(RecordPosition { partition, offset }),
            Err((e, _)) => Err(TransportError::Send {
                topic: topic.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// The producer is kept until the flush succeeds.
    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(producer) = self.producer.read().await.clone() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(FLUSH_TIMEOUT)))
            .await
            .map_err(|e| TransportError::Send {
                topic: "*".to_string(),
                reason: format!("flush task failed: {e}"),
            })?
            .map_err(|e| TransportError::Send {
                topic: "*".to_string(),
                reason: format!("flush failed: {e}"),
            })?;
        self.producer.write().await.take();
        info!("kafka producer flushed");
        Ok(())
    }
}

pub struct KafkaSubscriber {
    brokers: String,
    consumer: RwLock<Option<Arc<StreamConsumer>>>,
}

impl KafkaSubscriber {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            consumer: RwLock::new(None),
        }
    }

    async fn current(&self) -> Result<Arc<StreamConsumer>, TransportError> {
        self.consumer
            .read()
            .await
            .clone()
            .ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl RecordSubscriber for KafkaSubscriber {
    async fn subscribe(&self, subscription: &Subscription) -> Result<(), TransportError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &subscription.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", subscription.offset_reset.as_str())
            .set("session.timeout.ms", "30000")
            .set("max.poll.interval.ms", "300000")
            .create()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        consumer
            .subscribe(&[subscription.topic.as_str()])
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        info!(
            brokers = %self.brokers,
            topic = %subscription.topic,
            group_id = %subscription.group_id,
            "kafka consumer subscribed"
        );
        *self.consumer.write().await = Some(Arc::new(consumer));
        Ok(())
    }

    async fn next_record(&self) -> Result<Option<ConsumedRecord>, TransportError> {
        let consumer = self.current().await?;
        let message = consumer
            .recv()
            .await
            .map_err(|e| TransportError::Receive(e.to_string()))?;

        Ok(Some(ConsumedRecord {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        }))
    }

    async fn commit(&self, record: &ConsumedRecord) -> Result<(), TransportError> {
        let consumer = self.current().await?;

        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(&record.topic, record.partition, Offset::Offset(record.offset + 1))
            .map_err(|e| TransportError::Commit(e.to_string()))?;

        tokio::task::spawn_blocking(move || consumer.commit(&offsets, CommitMode::Sync))
            .await
            .map_err(|e| TransportError::Commit(format!("commit task failed: {e}")))?
            .map_err(|e| TransportError::Commit(e.to_string()))
    }

    async fn unsubscribe(&self) -> Result<(), TransportError> {
        match self.consumer.write().await.take() {
            Some(consumer) => {
                consumer.unsubscribe();
                info!("kafka consumer left group");
            }
            None => warn!("unsubscribe without an active subscription"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_before_connect_is_not_connected() {
        let publisher = KafkaPublisher::new("localhost:9092");
        let err = publisher.publish("moderation", b"{}").await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn disconnect_flushes_and_releases_the_producer() {
        // client creation and an empty flush need no reachable broker
        let publisher = KafkaPublisher::new("localhost:9092");
        publisher.disconnect().await.unwrap();

        publisher.connect().await.unwrap();
        publisher.disconnect().await.unwrap();

        let err = publisher.publish("moderation", b"{}").await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn next_before_subscribe_is_not_connected() {
        let subscriber = KafkaSubscriber::new("localhost:9092");
        let err = subscriber.next_record().await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }
}
