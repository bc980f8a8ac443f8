//! PredictionService port - スコアリング
//!
//! The worker treats scoring as opaque: an item id goes in, a violation flag
//! and probability come out.

use async_trait::async_trait;

use crate::domain::{ItemId, Prediction, PredictionError};

#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Score one item.
    ///
    /// # Errors
    /// - `NotFound`: the item does not exist
    /// - `Unavailable`: the scoring backend is not loaded
    /// - `Fault`: anything else went wrong while scoring
    async fn predict(&self, item_id: ItemId) -> Result<Prediction, PredictionError>;
}
