//! Model lifecycle settings parsed from environment variables.

use super::{Lookup, parse_or};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Model trainer environment configuration
#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    pub retrain_interval: Duration,
    pub min_train_samples: usize,
    /// How many recent observations the trainer sees
    pub training_window: usize,
    /// Trailing share of the window held out for validation
    pub validation_fraction: f64,
    pub model_path: PathBuf,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            retrain_interval: Duration::from_secs(24 * 60 * 60),
            min_train_samples: 20,
            training_window: 5000,
            validation_fraction: 0.2,
            model_path: PathBuf::from("data/model.json"),
        }
    }
}

impl ModelEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            retrain_interval: Duration::from_secs(parse_or(
                lookup,
                "RETRAIN_INTERVAL_SECS",
                defaults.retrain_interval.as_secs(),
            )?),
            min_train_samples: parse_or(lookup, "MIN_TRAIN_SAMPLES", defaults.min_train_samples)?,
            training_window: parse_or(lookup, "TRAINING_WINDOW", defaults.training_window)?,
            validation_fraction: parse_or(
                lookup,
                "VALIDATION_FRACTION",
                defaults.validation_fraction,
            )?,
            model_path: lookup("MODEL_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_train_samples < 3 {
            anyhow::bail!(
                "MIN_TRAIN_SAMPLES must be >= 3, got {}",
                self.min_train_samples
            );
        }
        if !(0.0..0.9).contains(&self.validation_fraction) {
            anyhow::bail!(
                "VALIDATION_FRACTION must be in [0.0, 0.9), got {}",
                self.validation_fraction
            );
        }
        Ok(())
    }
}
