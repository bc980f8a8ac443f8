//! Scoring - 広告の違反確率を計算する
//!
//! `ModelPredictionService` is the `PredictionService` the worker uses outside
//! of tests: catalog lookup, feature extraction, then a `ScoringModel`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Features, ItemId, Prediction, PredictionError};
use crate::ports::{AdvertisementCatalog, PredictionService};

/// Maps normalized features to a prediction.
pub trait ScoringModel: Send + Sync {
    fn score(&self, features: &Features) -> Result<Prediction, PredictionError>;
}

/// Logistic regression over fixed coefficients.
///
/// Feature order: verified seller, images, description length, category.
/// Unverified sellers with few images score high.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearScoringModel {
    coefficients: Option<([f64; 4], f64)>,
}

impl LinearScoringModel {
    pub const DEFAULT_WEIGHTS: [f64; 4] = [-4.0, -6.0, -0.5, 0.0];
    pub const DEFAULT_BIAS: f64 = 2.5;
    /// probability >= threshold → violation
    pub const THRESHOLD: f64 = 0.5;

    pub fn new(weights: [f64; 4], bias: f64) -> Self {
        Self {
            coefficients: Some((weights, bias)),
        }
    }

    /// A model that was never loaded; every `score` is `Unavailable`.
    pub fn unloaded() -> Self {
        Self { coefficients: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.coefficients.is_some()
    }
}

impl Default for LinearScoringModel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WEIGHTS, Self::DEFAULT_BIAS)
    }
}

impl ScoringModel for LinearScoringModel {
    fn score(&self, features: &Features) -> Result<Prediction, PredictionError> {
        let (weights, bias) = self
            .coefficients
            .as_ref()
            .ok_or_else(|| PredictionError::Unavailable("model is not loaded".to_string()))?;

        let z = weights
            .iter()
            .zip(features.as_slice())
            .fold(*bias, |acc, (w, x)| acc + w * x);
        let probability = 1.0 / (1.0 + (-z).exp());

        Prediction::new(probability >= Self::THRESHOLD, probability)
    }
}

pub struct ModelPredictionService {
    catalog: Arc<dyn AdvertisementCatalog>,
    model: Arc<dyn ScoringModel>,
}

impl ModelPredictionService {
    pub fn new(catalog: Arc<dyn AdvertisementCatalog>, model: Arc<dyn ScoringModel>) -> Self {
        Self { catalog, model }
    }
}

#[async_trait]
impl PredictionService for ModelPredictionService {
    async fn predict(&self, item_id: ItemId) -> Result<Prediction, PredictionError> {
        let ad = self
            .catalog
            .get(item_id)
            .await
            .map_err(|e| PredictionError::Fault(e.to_string()))?
            .ok_or(PredictionError::NotFound(item_id))?;

        let features = Features::from_advertisement(&ad);
        let prediction = self.model.score(&features)?;
        debug!(
            item_id = %item_id,
            seller_id = %ad.seller_id,
            is_violation = prediction.is_violation,
            probability = prediction.probability,
            "scored"
        );
        Ok(prediction)
    }
}
