//! InMemoryBroker - 開発用のメッセージブローカー
//!
//! # 実装詳細
//! - topic ごとに append-only のログ（partition 0 のみ）
//! - consumer group ごとの committed offset（次に読む位置）
//! - commit されていない record は同じ group の次の subscriber に再配送
//! - tokio `Mutex` + `Notify` で publish 時に待機中の subscriber を起こす
//!
//! ```ignore
//! let broker = InMemoryBroker::new();
//! let publisher = broker.publisher();
//! let subscriber = broker.subscriber();
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::domain::TransportError;
use crate::ports::{
    ConsumedRecord, OffsetReset, RecordPosition, RecordPublisher, RecordSubscriber, Subscription,
};

#[derive(Default)]
struct BrokerState {
    /// topic -> records
    topics: HashMap<String, Vec<Vec<u8>>>,
    /// (group, topic) -> next offset to read
    committed: HashMap<(String, String), i64>,
    /// group -> number of commits
    commits: HashMap<String, usize>,
    /// topics whose publishes fail
    rejected: HashSet<String>,
    closed: bool,
}

/// Shared broker handle. Cloning shares the same logs.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publisher(&self) -> InMemoryPublisher {
        InMemoryPublisher {
            broker: self.clone(),
            connected: AtomicBool::new(false),
        }
    }

    pub fn subscriber(&self) -> InMemorySubscriber {
        InMemorySubscriber {
            broker: self.clone(),
            cursor: Mutex::new(None),
        }
    }

    /// End every subscription once it has drained its topic.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    /// Make publishes to `topic` fail (fault injection).
    pub async fn reject_topic(&self, topic: &str) {
        self.state.lock().await.rejected.insert(topic.to_string());
    }

    /// All payloads on `topic`, oldest first.
    pub async fn records(&self, topic: &str) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .await
            .topics
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn committed_offset(&self, group_id: &str, topic: &str) -> Option<i64> {
        self.state
            .lock()
            .await
            .committed
            .get(&(group_id.to_string(), topic.to_string()))
            .copied()
    }

    pub async fn commit_count(&self, group_id: &str) -> usize {
        self.state
            .lock()
            .await
            .commits
            .get(group_id)
            .copied()
            .unwrap_or(0)
    }
}

pub struct InMemoryPublisher {
    broker: InMemoryBroker,
    connected: AtomicBool,
}

#[async_trait]
impl RecordPublisher for InMemoryPublisher {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<RecordPosition, TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }

        let offset = {
            let mut state = self.broker.state.lock().await;
            if state.rejected.contains(topic) {
                return Err(TransportError::Send {
                    topic: topic.to_string(),
                    reason: "topic rejected by broker".to_string(),
                });
            }
            let log = state.topics.entry(topic.to_string()).or_default();
            log.push(payload.to_vec());
            (log.len() - 1) as i64
        };

        self.broker.notify.notify_waiters();
        Ok(RecordPosition {
            partition: 0,
            offset,
        })
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct Cursor {
    topic: String,
    group_id: String,
    position: i64,
}

pub struct InMemorySubscriber {
    broker: InMemoryBroker,
    cursor: Mutex<Option<Cursor>>,
}

#[async_trait]
impl RecordSubscriber for InMemorySubscriber {
    async fn subscribe(&self, subscription: &Subscription) -> Result<(), TransportError> {
        let position = {
            let state = self.broker.state.lock().await;
            let key = (subscription.group_id.clone(), subscription.topic.clone());
            match state.committed.get(&key) {
                Some(committed) => *committed,
                None => match subscription.offset_reset {
                    OffsetReset::Earliest => 0,
                    OffsetReset::Latest => state
                        .topics
                        .get(&subscription.topic)
                        .map_or(0, |log| log.len() as i64),
                },
            }
        };

        *self.cursor.lock().await = Some(Cursor {
            topic: subscription.topic.clone(),
            group_id: subscription.group_id.clone(),
            position,
        });
        Ok(())
    }

    async fn next_record(&self) -> Result<Option<ConsumedRecord>, TransportError> {
        loop {
            // register interest before looking, so a publish in between is not missed
            let notified = self.broker.notify.notified();
            {
                let mut cursor = self.cursor.lock().await;
                let cursor = cursor.as_mut().ok_or(TransportError::NotConnected)?;
                let state = self.broker.state.lock().await;

                let next = state
                    .topics
                    .get(&cursor.topic)
                    .and_then(|log| log.get(cursor.position as usize));
                if let Some(payload) = next {
                    let record = ConsumedRecord {
                        topic: cursor.topic.clone(),
                        partition: 0,
                        offset: cursor.position,
                        payload: payload.clone(),
                    };
                    cursor.position += 1;
                    return Ok(Some(record));
                }
                if state.closed {
                    return Ok(None);
                }
            }
            notified.await;
        }
    }

    async fn commit(&self, record: &ConsumedRecord) -> Result<(), TransportError> {
        let cursor = self.cursor.lock().await;
        let cursor = cursor.as_ref().ok_or(TransportError::NotConnected)?;
        if cursor.topic != record.topic {
            return Err(TransportError::Commit(format!(
                "record from '{}' does not belong to subscription '{}'",
                record.topic, cursor.topic
            )));
        }

        let mut state = self.broker.state.lock().await;
        state
            .committed
            .insert((cursor.group_id.clone(), record.topic.clone()), record.offset + 1);
        *state.commits.entry(cursor.group_id.clone()).or_default() += 1;
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), TransportError> {
        *self.cursor.lock().await = None;
        Ok(())
    }
}
