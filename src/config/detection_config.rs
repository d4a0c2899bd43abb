//! Opportunity detector thresholds parsed from environment variables.

use super::{Lookup, parse_or};
use anyhow::Result;

/// Detector environment configuration
#[derive(Debug, Clone)]
pub struct DetectionEnvConfig {
    pub min_detect_samples: usize,
    /// Size of the `recent(n)` window handed to the detector
    pub detection_window: usize,
    pub deviation_multiplier_k: f64,
    pub model_divergence_tolerance: f64,
    pub alert_on_upper_band: bool,
}

impl Default for DetectionEnvConfig {
    fn default() -> Self {
        Self {
            min_detect_samples: 30,
            detection_window: 30,
            deviation_multiplier_k: 0.5,
            model_divergence_tolerance: 0.01,
            alert_on_upper_band: false,
        }
    }
}

impl DetectionEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        let min_detect_samples =
            parse_or(lookup, "MIN_DETECT_SAMPLES", defaults.min_detect_samples)?;
        Ok(Self {
            min_detect_samples,
            // The window defaults to exactly what the detector needs
            detection_window: parse_or(lookup, "DETECTION_WINDOW", min_detect_samples)?,
            deviation_multiplier_k: parse_or(
                lookup,
                "DEVIATION_MULTIPLIER_K",
                defaults.deviation_multiplier_k,
            )?,
            model_divergence_tolerance: parse_or(
                lookup,
                "MODEL_DIVERGENCE_TOLERANCE",
                defaults.model_divergence_tolerance,
            )?,
            alert_on_upper_band: parse_or(
                lookup,
                "ALERT_ON_UPPER_BAND",
                defaults.alert_on_upper_band,
            )?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_detect_samples < 2 {
            anyhow::bail!(
                "MIN_DETECT_SAMPLES must be >= 2 to compute a standard deviation, got {}",
                self.min_detect_samples
            );
        }
        if self.detection_window < self.min_detect_samples {
            anyhow::bail!(
                "DETECTION_WINDOW ({}) must be >= MIN_DETECT_SAMPLES ({})",
                self.detection_window,
                self.min_detect_samples
            );
        }
        if !self.deviation_multiplier_k.is_finite() || self.deviation_multiplier_k < 0.0 {
            anyhow::bail!(
                "DEVIATION_MULTIPLIER_K must be a non-negative number, got {}",
                self.deviation_multiplier_k
            );
        }
        if !self.model_divergence_tolerance.is_finite() || self.model_divergence_tolerance <= 0.0
        {
            anyhow::bail!(
                "MODEL_DIVERGENCE_TOLERANCE must be > 0, got {}",
                self.model_divergence_tolerance
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_follows_min_samples() {
        let lookup = |key: &str| (key == "MIN_DETECT_SAMPLES").then(|| "45".to_string());
        let config = DetectionEnvConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.detection_window, 45);
    }

    #[test]
    fn test_negative_multiplier_rejected() {
        let config = DetectionEnvConfig {
            deviation_multiplier_k: -0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
