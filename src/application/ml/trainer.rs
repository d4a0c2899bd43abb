use super::fitter::RegressionFitter;
use crate::config::ModelEnvConfig;
use crate::domain::errors::TrainError;
use crate::domain::market::Observation;
use crate::domain::ml::feature_registry::{select_features, signal_name};
use crate::domain::ml::{LinearParameters, Model, ValidationMetrics};
use chrono::{DateTime, TimeDelta, Utc};
use statrs::statistics::{Data, Distribution};
use std::sync::Arc;
use tracing::{debug, info};

/// Columns whose spread is below this are treated as constant
const MIN_STD_DEV: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct TrainerSettings {
    pub min_train_samples: usize,
    pub retrain_interval: TimeDelta,
    pub validation_fraction: f64,
}

impl From<&ModelEnvConfig> for TrainerSettings {
    fn from(config: &ModelEnvConfig) -> Self {
        Self {
            min_train_samples: config.min_train_samples,
            retrain_interval: TimeDelta::from_std(config.retrain_interval)
                .unwrap_or(TimeDelta::MAX),
            validation_fraction: config.validation_fraction,
        }
    }
}

/// Fits the price-from-signals regression and decides when a refit is due.
pub struct ModelTrainer {
    fitter: Arc<dyn RegressionFitter>,
    settings: TrainerSettings,
}

impl ModelTrainer {
    pub fn new(fitter: Arc<dyn RegressionFitter>, settings: TrainerSettings) -> Self {
        Self { fitter, settings }
    }

    pub fn settings(&self) -> &TrainerSettings {
        &self.settings
    }

    /// Enough history, and either no model yet or the current one is stale.
    pub fn is_due(&self, available: usize, current: Option<&Model>, now: DateTime<Utc>) -> bool {
        if available < self.settings.min_train_samples {
            return false;
        }
        match current {
            None => true,
            Some(model) => model.age(now) > self.settings.retrain_interval,
        }
    }

    /// Train a new model if one is due.
    ///
    /// `Ok(None)` means nothing was attempted. An `Err` means an attempt was
    /// made and failed; the caller keeps whatever model it already has.
    pub fn maybe_retrain(
        &self,
        observations: &[Observation],
        current: Option<&Model>,
        now: DateTime<Utc>,
    ) -> Result<Option<Model>, TrainError> {
        if !self.is_due(observations.len(), current, now) {
            debug!(
                "Trainer: not due ({} observations, current model {:?})",
                observations.len(),
                current.map(|m| m.version)
            );
            return Ok(None);
        }
        self.train(observations, current, now).map(Some)
    }

    /// Unconditional fit over `observations` (oldest first).
    pub fn train(
        &self,
        observations: &[Observation],
        current: Option<&Model>,
        now: DateTime<Utc>,
    ) -> Result<Model, TrainError> {
        let total = observations.len();
        if total < self.settings.min_train_samples {
            return Err(TrainError::InsufficientData {
                available: total,
                required: self.settings.min_train_samples,
            });
        }

        let arity = observations[0].arity();
        if observations.iter().any(|o| o.arity() != arity) {
            return Err(TrainError::NumericalFailure {
                reason: "observations disagree on auxiliary arity".to_string(),
            });
        }

        // Chronological split, newest rows held out
        let validation_len = ((total as f64) * self.settings.validation_fraction).floor() as usize;
        let (training, holdout) = observations.split_at(total - validation_len);

        let targets: Vec<f64> = training.iter().map(|o| o.primary_value()).collect();
        if std_dev(&targets) < MIN_STD_DEV {
            return Err(TrainError::InsufficientVariance {
                reason: "price is constant across the training partition".to_string(),
            });
        }

        let feature_spec: Vec<usize> = (0..arity)
            .filter(|&idx| {
                let column: Vec<f64> = training
                    .iter()
                    .map(|o| o.auxiliary_values()[idx])
                    .collect();
                let spread = std_dev(&column);
                if spread < MIN_STD_DEV {
                    debug!("Trainer: dropping constant signal {}", signal_name(idx));
                }
                spread >= MIN_STD_DEV
            })
            .collect();
        if feature_spec.is_empty() {
            return Err(TrainError::InsufficientVariance {
                reason: "every auxiliary signal is constant across the training partition"
                    .to_string(),
            });
        }

        let required = feature_spec.len() + 2;
        if training.len() < required {
            return Err(TrainError::InsufficientData {
                available: training.len(),
                required,
            });
        }

        let features = design_matrix(training, &feature_spec)?;
        let parameters = self.fitter.fit(&features, &targets)?;
        if parameters.coefficients.len() != feature_spec.len() || !parameters.is_finite() {
            return Err(TrainError::NumericalFailure {
                reason: format!("{} returned unusable parameters", self.fitter.name()),
            });
        }

        let validation = validate(&parameters, holdout, &feature_spec, training.len())?;
        let version = current.map_or(1, |m| m.version + 1);

        info!(
            "Trainer: fitted model v{} on {} rows (features: {:?}, validation rmse: {:?})",
            version,
            training.len(),
            feature_spec.iter().map(|&i| signal_name(i)).collect::<Vec<_>>(),
            validation.rmse
        );

        Ok(Model {
            version,
            trained_at: now,
            feature_spec,
            parameters,
            validation,
        })
    }
}

fn std_dev(values: &[f64]) -> f64 {
    Data::new(values.to_vec())
        .std_dev()
        .filter(|s| s.is_finite())
        .unwrap_or(0.0)
}

fn design_matrix(rows: &[Observation], feature_spec: &[usize]) -> Result<Vec<Vec<f64>>, TrainError> {
    rows.iter()
        .map(|o| {
            select_features(o.auxiliary_values(), feature_spec).ok_or_else(|| {
                TrainError::NumericalFailure {
                    reason: "feature index out of range".to_string(),
                }
            })
        })
        .collect()
}

/// RMSE and MAE over the hold-out rows
fn validate(
    parameters: &LinearParameters,
    holdout: &[Observation],
    feature_spec: &[usize],
    train_samples: usize,
) -> Result<ValidationMetrics, TrainError> {
    if holdout.is_empty() {
        return Ok(ValidationMetrics {
            train_samples,
            validation_samples: 0,
            rmse: None,
            mae: None,
        });
    }

    let features = design_matrix(holdout, feature_spec)?;
    let mut squared = 0.0;
    let mut absolute = 0.0;
    for (row, observation) in features.iter().zip(holdout) {
        let predicted = parameters
            .evaluate(row)
            .ok_or_else(|| TrainError::NumericalFailure {
                reason: "non-finite validation prediction".to_string(),
            })?;
        let error = predicted - observation.primary_value();
        squared += error * error;
        absolute += error.abs();
    }

    let n = holdout.len() as f64;
    let rmse = (squared / n).sqrt();
    let mae = absolute / n;
    if !rmse.is_finite() || !mae.is_finite() {
        return Err(TrainError::NumericalFailure {
            reason: "non-finite validation metrics".to_string(),
        });
    }

    Ok(ValidationMetrics {
        train_samples,
        validation_samples: holdout.len(),
        rmse: Some(rmse),
        mae: Some(mae),
    })
}
