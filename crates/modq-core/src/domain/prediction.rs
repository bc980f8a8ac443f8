//! Prediction results and the advertisement features they are computed from.

use serde::{Deserialize, Serialize};

use super::errors::PredictionError;
use super::ids::{ItemId, SellerId};

/// Output of the scoring step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub is_violation: bool,
    pub probability: f64,
}

impl Prediction {
    /// Probability must be a finite value in [0, 1].
    pub fn new(is_violation: bool, probability: f64) -> Result<Self, PredictionError> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(PredictionError::Fault(format!(
                "probability {probability} outside [0, 1]"
            )));
        }
        Ok(Self {
            is_violation,
            probability,
        })
    }
}

/// An advertisement joined with its seller, as the scoring step sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advertisement {
    pub item_id: ItemId,
    pub seller_id: SellerId,
    pub is_verified_seller: bool,
    pub name: String,
    pub description: String,
    pub category: u32,
    pub images_qty: u32,
}

/// Normalized model input:
/// `[is_verified, images/10, description_len/1000, category/100]`, each capped at 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features(pub [f64; 4]);

impl Features {
    pub fn from_advertisement(ad: &Advertisement) -> Self {
        let verified = if ad.is_verified_seller { 1.0 } else { 0.0 };
        let images = (f64::from(ad.images_qty) / 10.0).min(1.0);
        let description = (ad.description.chars().count() as f64 / 1000.0).min(1.0);
        let category = (f64::from(ad.category) / 100.0).min(1.0);
        Self([verified, images, description, category])
    }

    pub fn as_slice(&self) -> &[f64; 4] {
        &self.0
    }
}
