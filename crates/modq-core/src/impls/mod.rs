//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryBroker**: 開発・テスト用のブローカー（publisher / subscriber）
//! - **InMemoryModerationStore**: テスト用の正本
//! - **InMemoryCatalog**: 広告データ
//! - **ModelPredictionService**: catalog + `ScoringModel` による予測
//! - **KafkaPublisher / KafkaSubscriber**: 本番用（feature `kafka`）

pub mod catalog;
pub mod inmem_broker;
pub mod inmem_store;
pub mod scoring;

#[cfg(feature = "kafka")]
pub mod kafka;

// 主要な型を再エクスポート
pub use self::catalog::InMemoryCatalog;
pub use self::inmem_broker::{InMemoryBroker, InMemoryPublisher, InMemorySubscriber};
pub use self::inmem_store::InMemoryModerationStore;
pub use self::scoring::{LinearScoringModel, ModelPredictionService, ScoringModel};

#[cfg(feature = "kafka")]
pub use self::kafka::{KafkaPublisher, KafkaSubscriber};
