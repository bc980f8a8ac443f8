//! modq-worker
//!
//! Wires the moderation pipeline from environment settings and runs the
//! worker until Ctrl-C (or, with the in-memory transport, until the demo
//! requests are drained).

use std::sync::Arc;

use anyhow::Context;
use modq_core::app::{
    ModerationConsumer, ModerationProducer, ModerationService, ModerationWorker, Settings,
    TransportKind, WorkerHandle,
};
use modq_core::domain::{Advertisement, ItemId, SellerId, TaskId};
use modq_core::impls::{
    InMemoryBroker, InMemoryCatalog, InMemoryModerationStore, LinearScoringModel,
    ModelPredictionService,
};
use modq_core::ports::{Clock, RecordPublisher, RecordSubscriber, Subscription, SystemClock};
use rand::Rng;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_ITEMS: u64 = 8;

struct Transport {
    publisher: Arc<dyn RecordPublisher>,
    subscriber: Arc<dyn RecordSubscriber>,
    /// Only set for the in-memory transport.
    broker: Option<InMemoryBroker>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env は任意
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env().context("failed to load settings")?;
    info!(
        transport = ?settings.transport,
        moderation_topic = %settings.topics.moderation,
        dlq_topic = %settings.topics.dead_letter,
        group_id = %settings.consumer_group,
        max_attempts = settings.retry.max_attempts,
        cooldown_ms = settings.retry.cooldown.as_millis() as u64,
        "settings loaded"
    );

    let transport = match settings.transport {
        TransportKind::Memory => memory_transport(),
        TransportKind::Kafka => kafka_transport(&settings)?,
    };

    // ========================================================================
    // WIRING
    // ========================================================================
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let catalog = Arc::new(InMemoryCatalog::new());
    for ad in demo_advertisements(DEMO_ITEMS) {
        catalog.insert(ad).await;
    }

    let producer = Arc::new(ModerationProducer::new(
        transport.publisher,
        settings.topics.clone(),
        clock.clone(),
    ));
    let service = Arc::new(ModerationService::new(
        Arc::new(InMemoryModerationStore::new()),
        catalog.clone(),
        producer.clone(),
        clock,
    ));
    let predictor = Arc::new(ModelPredictionService::new(
        catalog,
        Arc::new(LinearScoringModel::default()),
    ));
    let consumer = ModerationConsumer::new(
        transport.subscriber,
        Subscription::new(settings.topics.moderation.clone(), settings.consumer_group.clone()),
    );
    let worker = ModerationWorker::new(consumer, producer, predictor, service.clone(), settings.retry.clone());

    // in-memory mode feeds itself and stops once drained
    let mut submitted = Vec::new();
    if let Some(broker) = &transport.broker {
        for raw in 1..=DEMO_ITEMS {
            let task_id = service
                .submit(ItemId::new(raw))
                .await
                .with_context(|| format!("failed to submit demo item {raw}"))?;
            submitted.push(task_id);
        }
        broker.close().await;
    }

    let (handle, shutdown) = WorkerHandle::new();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("ctrl-c received"),
            Err(e) => error!(error = %e, "failed to listen for ctrl-c"),
        }
        handle.shutdown();
    });

    let summary = worker.run(shutdown).await.context("worker stopped on transport fault")?;
    info!(
        processed = summary.processed,
        completed = summary.completed,
        dead_lettered = summary.dead_lettered,
        skipped = summary.skipped,
        "run finished"
    );

    report(&service, &submitted).await;
    Ok(())
}

fn memory_transport() -> Transport {
    let broker = InMemoryBroker::new();
    Transport {
        publisher: Arc::new(broker.publisher()),
        subscriber: Arc::new(broker.subscriber()),
        broker: Some(broker),
    }
}

#[cfg(feature = "kafka")]
fn kafka_transport(settings: &Settings) -> anyhow::Result<Transport> {
    use modq_core::impls::{KafkaPublisher, KafkaSubscriber};

    let brokers = settings
        .bootstrap_servers
        .clone()
        .context("KAFKA_BOOTSTRAP is required for the kafka transport")?;
    Ok(Transport {
        publisher: Arc::new(KafkaPublisher::new(brokers.clone())),
        subscriber: Arc::new(KafkaSubscriber::new(brokers)),
        broker: None,
    })
}

#[cfg(not(feature = "kafka"))]
fn kafka_transport(_settings: &Settings) -> anyhow::Result<Transport> {
    anyhow::bail!("MODQ_TRANSPORT=kafka needs a build with `--features kafka`")
}

/// Random catalog for the demo run. Item ids are `1..=count`.
fn demo_advertisements(count: u64) -> Vec<Advertisement> {
    let mut rng = rand::thread_rng();
    (1..=count)
        .map(|raw| Advertisement {
            item_id: ItemId::new(raw),
            seller_id: SellerId::new(rng.gen_range(1..=3)),
            is_verified_seller: rng.gen_bool(0.5),
            name: format!("demo item {raw}"),
            description: "x".repeat(rng.gen_range(0..1500)),
            category: rng.gen_range(1..=120),
            images_qty: rng.gen_range(0..=12),
        })
        .collect()
}

async fn report(service: &ModerationService, tasks: &[TaskId]) {
    for &task_id in tasks {
        match service.result(task_id).await {
            Ok(result) => info!(
                task_id = %result.task_id,
                status = %result.status,
                is_violation = ?result.is_violation,
                probability = ?result.probability,
                "moderation result"
            ),
            Err(e) => warn!(task_id = %task_id, error = %e, "result unavailable"),
        }
    }
}
