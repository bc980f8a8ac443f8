//! modq-core
//!
//! Core building blocks for the moderation queue worker.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, envelope, task, prediction, state, errors）
//! - **ports**: 抽象化レイヤー（ModerationStore, PredictionService, RecordPublisher, ...）
//! - **app**: アプリケーションロジック（config, producer, consumer, service, worker）
//! - **impls**: 実装（InMemoryBroker, InMemoryModerationStore, Kafka など）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
