//! App - アプリケーション層
//!
//! ports を組み合わせて moderation pipeline を実装します。
//!
//! # 主要コンポーネント
//! - **Settings**: 環境変数からの設定
//! - **ModerationProducer / ModerationConsumer**: トピックへの送受信
//! - **ModerationService**: task の作成・参照・終端状態への更新
//! - **ModerationWorker**: 受信→予測→保存（retry / dead-letter 付き）

pub mod config;
pub mod consumer;
pub mod producer;
pub mod retry;
pub mod service;
pub mod worker;

// 主要な型を再エクスポート
pub use self::config::{ConfigError, Settings, TopicNames, TransportKind};
pub use self::consumer::ModerationConsumer;
pub use self::producer::ModerationProducer;
pub use self::retry::RetryPolicy;
pub use self::service::ModerationService;
pub use self::worker::{ModerationWorker, RunSummary, WorkerHandle};
