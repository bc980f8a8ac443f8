//! Transport ports - メッセージキュー（Kafka または InMemory）
//!
//! Two halves of the broker client:
//! - [`RecordPublisher`]: acknowledged sends (the call returns only after the
//!   broker has the record).
//! - [`RecordSubscriber`]: pull-based consumption under a consumer group with
//!   manual offset commit.
//!
//! Both carry opaque byte payloads; encoding lives in `domain::envelope`.

use async_trait::async_trait;

use crate::domain::TransportError;

/// Where an acknowledged record landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPosition {
    pub partition: i32,
    pub offset: i64,
}

/// One record handed out by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

/// Start position for a group that has never committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetReset {
    #[default]
    Earliest,
    Latest,
}

impl OffsetReset {
    pub fn as_str(self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

/// What to subscribe to. Offsets only move on explicit commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic: String,
    pub group_id: String,
    pub offset_reset: OffsetReset,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            group_id: group_id.into(),
            offset_reset: OffsetReset::Earliest,
        }
    }
}

#[async_trait]
pub trait RecordPublisher: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;

    /// Publish and wait for the broker acknowledgement (at-least-once).
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<RecordPosition, TransportError>;

    /// Flush and close.
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait RecordSubscriber: Send + Sync {
    async fn subscribe(&self, subscription: &Subscription) -> Result<(), TransportError>;

    /// Wait for the next record. `None` means the stream has ended.
    ///
    /// Must be cancel-safe: dropping the future before it resolves must not
    /// lose a record.
    async fn next_record(&self) -> Result<Option<ConsumedRecord>, TransportError>;

    /// Commit `record.offset + 1` for the subscribed group.
    async fn commit(&self, record: &ConsumedRecord) -> Result<(), TransportError>;

    /// Leave the group.
    async fn unsubscribe(&self) -> Result<(), TransportError>;
}
