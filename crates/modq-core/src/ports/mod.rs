//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。worker は以下の trait だけに依存する。
//!
//! - ModerationStore が moderation task の正本（source of truth）
//! - RecordPublisher / RecordSubscriber がメッセージキュー（payload はバイト列）
//! - PredictionService はスコアリングを隠蔽する

pub mod catalog;
pub mod clock;
pub mod moderation_store;
pub mod prediction;
pub mod transport;

// 主要な trait を再エクスポート
pub use self::catalog::AdvertisementCatalog;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::moderation_store::ModerationStore;
pub use self::prediction::PredictionService;
pub use self::transport::{
    ConsumedRecord, OffsetReset, RecordPosition, RecordPublisher, RecordSubscriber, Subscription,
};
