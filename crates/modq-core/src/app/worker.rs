//! ModerationWorker - 受信→予測→保存、失敗時は retry→dead-letter
//!
//! # フロー
//! 1. consumer から 1 件取得
//! 2. envelope を decode（失敗したら即 dead-letter）
//! 3. task がすでに終端状態なら何もしない（再配送）
//! 4. PredictionService で予測 → ModerationService で completed に更新
//! 5. 失敗したら retry ループ（予算 N、初回を 1 回目と数える）
//! 6. 予算切れなら dead-letter 送信 + failed に更新
//! 7. どの結果でも offset を commit
//!
//! Messages are handled strictly one at a time: the next record is fetched
//! only after the previous one is committed. Transport errors are never
//! absorbed; they end the run loop after an orderly `stop()`.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::consumer::ModerationConsumer;
use super::producer::ModerationProducer;
use super::retry::RetryPolicy;
use super::service::ModerationService;
use crate::domain::{
    ErrorKind, ItemId, ModerationError, ModerationRequestMessage, Prediction, ProcessOutcome,
    ProcessingState, TaskId, TransportError,
};
use crate::ports::{ConsumedRecord, PredictionService};

/// Counters for one `run()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub completed: usize,
    pub dead_lettered: usize,
    /// Redeliveries of tasks that were already terminal.
    pub skipped: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &ProcessOutcome) {
        self.processed += 1;
        match outcome {
            ProcessOutcome::Completed { .. } => self.completed += 1,
            ProcessOutcome::DeadLettered { .. } | ProcessOutcome::Rejected => {
                self.dead_lettered += 1
            }
            ProcessOutcome::AlreadyHandled { .. } => self.skipped += 1,
        }
    }
}

/// Shutdown trigger for a running worker.
///
/// The in-flight message always finishes; only the wait for the next record
/// is interrupted. Dropping the handle also stops the worker.
pub struct WorkerHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl WorkerHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        (Self { shutdown_tx }, shutdown_rx)
    }

    pub fn shutdown(&self) {
        // receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }
}

pub struct ModerationWorker {
    consumer: ModerationConsumer,
    producer: Arc<ModerationProducer>,
    predictor: Arc<dyn PredictionService>,
    tasks: Arc<ModerationService>,
    policy: RetryPolicy,
}

impl ModerationWorker {
    pub fn new(
        consumer: ModerationConsumer,
        producer: Arc<ModerationProducer>,
        predictor: Arc<dyn PredictionService>,
        tasks: Arc<ModerationService>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            consumer,
            producer,
            predictor,
            tasks,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn start(&self) -> Result<(), TransportError> {
        self.producer.start().await?;
        self.consumer.start().await
    }

    /// Stop both transports. Both are attempted even if the first fails.
    pub async fn stop(&self) -> Result<(), TransportError> {
        let consumer = self.consumer.stop().await;
        let producer = self.producer.stop().await;
        consumer.and(producer)
    }

    /// Consume until shutdown, end of stream, or a transport fault.
    ///
    /// `stop()` is always called on the way out; a transport fault is
    /// returned after it.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<RunSummary, TransportError> {
        let consumed = match self.start().await {
            Ok(()) => self.consume(&mut shutdown).await,
            Err(e) => Err(e),
        };
        let stopped = self.stop().await;

        let summary = consumed.inspect_err(|e| error!(error = %e, "run loop aborted by transport fault"))?;
        stopped?;
        info!(
            processed = summary.processed,
            completed = summary.completed,
            dead_lettered = summary.dead_lettered,
            skipped = summary.skipped,
            "worker stopped"
        );
        Ok(summary)
    }

    async fn consume(&self, shutdown: &mut watch::Receiver<bool>) -> Result<RunSummary, TransportError> {
        let mut summary = RunSummary::default();
        loop {
            if *shutdown.borrow() {
                info!("shutdown requested");
                break;
            }

            // only the wait for the next record races the shutdown signal
            let record = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("shutdown handle dropped");
                        break;
                    }
                    continue;
                }
                record = self.consumer.next() => record?,
            };

            let Some(record) = record else {
                info!("moderation stream ended");
                break;
            };

            let outcome = self.process_moderation_request(&record).await?;
            summary.record(&outcome);
            self.consumer.commit(&record).await?;
        }
        Ok(summary)
    }

    /// Handle one record to a terminal state.
    ///
    /// Only transport faults escape; prediction and store faults are absorbed
    /// by the retry loop.
    pub async fn process_moderation_request(
        &self,
        record: &ConsumedRecord,
    ) -> Result<ProcessOutcome, TransportError> {
        let message = match ModerationRequestMessage::decode(&record.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(offset = record.offset, error = %e, "undecodable moderation request");
                let raw = String::from_utf8_lossy(&record.payload);
                self.producer
                    .send_to_dlq(&raw, ErrorKind::Unclassified.name(), 0)
                    .await?;
                return Ok(ProcessOutcome::Rejected);
            }
        };

        info!(
            task_id = %message.task_id,
            item_id = %message.item_id,
            timestamp = %message.timestamp,
            state = %ProcessingState::Received,
            "process task"
        );

        // a task is written at most once; a redelivery after a lost commit stops here
        match self.tasks.result(message.task_id).await {
            Ok(current) if current.status.is_terminal() => {
                info!(
                    task_id = %message.task_id,
                    status = %current.status,
                    "task already handled, skipping redelivery"
                );
                return Ok(ProcessOutcome::AlreadyHandled {
                    task_id: message.task_id,
                    status: current.status,
                });
            }
            Ok(_) => {}
            Err(e) => debug!(task_id = %message.task_id, error = %e, "task lookup failed, processing anyway"),
        }

        match self.attempt(message.task_id, message.item_id, 1).await {
            Ok(prediction) => Ok(ProcessOutcome::Completed {
                task_id: message.task_id,
                prediction,
                attempts: 1,
            }),
            Err(e) => {
                warn!(
                    task_id = %message.task_id,
                    item_id = %message.item_id,
                    attempt = 1,
                    error_kind = %e.kind(),
                    error = %e,
                    "initial attempt failed"
                );
                self.retry(message.task_id, message.item_id, e).await
            }
        }
    }

    /// Retry after the initial failure.
    ///
    /// The counter starts at 1 for the initial attempt and the loop runs while
    /// it is below the budget, so at most N-1 retries run and exhaustion
    /// reports `retry_count == N`. A successful retry ends the loop; the task
    /// stays completed and nothing is dead-lettered.
    async fn retry(
        &self,
        task_id: TaskId,
        item_id: ItemId,
        first_error: ModerationError,
    ) -> Result<ProcessOutcome, TransportError> {
        let mut retry_count: u32 = 1;
        let mut last_error = first_error;

        while self.policy.has_budget(retry_count) {
            let delay = self.policy.next_delay(retry_count);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let attempt = retry_count + 1;
            debug!(
                task_id = %task_id,
                attempt,
                state = %ProcessingState::Retrying { retry_count },
                "retrying"
            );
            match self.attempt(task_id, item_id, attempt).await {
                Ok(prediction) => {
                    info!(task_id = %task_id, attempt, "retry succeeded");
                    return Ok(ProcessOutcome::Completed {
                        task_id,
                        prediction,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    warn!(
                        task_id = %task_id,
                        attempt,
                        error_kind = %e.kind(),
                        error = %e,
                        "retry failed"
                    );
                    last_error = e;
                }
            }
            retry_count += 1;
        }

        let kind = last_error.kind();
        let detail = last_error.to_string();

        self.producer.send_to_dlq(&detail, kind.name(), retry_count).await?;

        if let Err(e) = self.tasks.fail_task(task_id, detail).await {
            // the dead-letter record is already durable; keep consuming
            error!(task_id = %task_id, error = %e, "could not mark task failed");
        }

        info!(
            task_id = %task_id,
            error_kind = %kind,
            retry_count,
            state = %ProcessingState::DeadLettered,
            "retry budget exhausted"
        );
        Ok(ProcessOutcome::DeadLettered {
            task_id,
            kind,
            retry_count,
        })
    }

    /// One pass: predict, then mark the task completed.
    async fn attempt(
        &self,
        task_id: TaskId,
        item_id: ItemId,
        attempt: u32,
    ) -> Result<Prediction, ModerationError> {
        debug!(
            task_id = %task_id,
            item_id = %item_id,
            attempt,
            state = %ProcessingState::Predicting,
            "predicting"
        );
        let prediction = self.predictor.predict(item_id).await?;
        self.tasks.complete_task(task_id, prediction).await?;
        info!(
            task_id = %task_id,
            attempt,
            is_violation = prediction.is_violation,
            probability = prediction.probability,
            state = %ProcessingState::Completed,
            "task completed"
        );
        Ok(prediction)
    }
}
