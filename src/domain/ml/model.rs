use super::feature_registry::select_features;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Affine regression surface: `intercept + sum(coefficients[i] * x[i])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearParameters {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearParameters {
    pub fn evaluate(&self, features: &[f64]) -> Option<f64> {
        if features.len() != self.coefficients.len() {
            return None;
        }
        let value = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>();
        value.is_finite().then_some(value)
    }

    pub fn is_finite(&self) -> bool {
        self.intercept.is_finite() && self.coefficients.iter().all(|c| c.is_finite())
    }
}

/// Out-of-sample error measured on the chronological hold-out partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub train_samples: usize,
    pub validation_samples: usize,
    /// `None` when the hold-out partition was empty
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
}

/// A trained regression artifact.
///
/// Once published a `Model` is shared behind an `Arc` and never mutated;
/// retraining produces a whole new value with a higher `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub version: u64,
    pub trained_at: DateTime<Utc>,
    /// Auxiliary-value indices consumed, in coefficient order
    pub feature_spec: Vec<usize>,
    pub parameters: LinearParameters,
    pub validation: ValidationMetrics,
}

impl Model {
    /// Predict the tracked price from an observation's auxiliary values.
    pub fn predict(&self, auxiliary_values: &[f64]) -> Option<f64> {
        let features = select_features(auxiliary_values, &self.feature_spec)?;
        self.parameters.evaluate(&features)
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.trained_at
    }
}
