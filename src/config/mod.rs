//! Configuration module for goldwatch.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Schedule, Model, Detection, Storage, and Observability.
//! Every sub-config parses through a lookup function so it can be exercised
//! in tests without touching the process environment.

mod detection_config;
mod model_config;
mod observability_config;
mod schedule_config;
mod storage_config;

pub use detection_config::DetectionEnvConfig;
pub use model_config::ModelEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use schedule_config::ScheduleEnvConfig;
pub use storage_config::StorageEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Variable lookup, `std::env::var` in production.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Parse `key` if set, otherwise fall back to `default`. A set but unparsable
/// value is an error rather than a silent default.
pub(crate) fn parse_or<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub schedule: ScheduleEnvConfig,
    pub model: ModelEnvConfig,
    pub detection: DetectionEnvConfig,
    pub storage: StorageEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let config = Self {
            schedule: ScheduleEnvConfig::from_lookup(lookup)
                .context("Failed to load schedule config")?,
            model: ModelEnvConfig::from_lookup(lookup).context("Failed to load model config")?,
            detection: DetectionEnvConfig::from_lookup(lookup)
                .context("Failed to load detection config")?,
            storage: StorageEnvConfig::from_lookup(lookup)
                .context("Failed to load storage config")?,
            observability: ObservabilityEnvConfig::from_lookup(lookup)
                .context("Failed to load observability config")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks. Any failure here is fatal at startup.
    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()?;
        self.model.validate()?;
        self.detection.validate()?;
        self.storage.validate()?;

        if self.model.training_window < self.model.min_train_samples {
            anyhow::bail!(
                "TRAINING_WINDOW ({}) must be >= MIN_TRAIN_SAMPLES ({})",
                self.model.training_window,
                self.model.min_train_samples
            );
        }
        Ok(())
    }
}
