use crate::config::DetectionEnvConfig;
use crate::domain::market::{Alert, DeviationKind, Observation};
use crate::domain::ml::Model;
use statrs::statistics::{Data, Distribution};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub min_detect_samples: usize,
    /// Band width in sample standard deviations
    pub deviation_multiplier_k: f64,
    /// Relative prediction error that counts as divergence
    pub model_divergence_tolerance: f64,
    pub alert_on_upper_band: bool,
}

impl From<&DetectionEnvConfig> for DetectorSettings {
    fn from(config: &DetectionEnvConfig) -> Self {
        Self {
            min_detect_samples: config.min_detect_samples,
            deviation_multiplier_k: config.deviation_multiplier_k,
            model_divergence_tolerance: config.model_divergence_tolerance,
            alert_on_upper_band: config.alert_on_upper_band,
        }
    }
}

/// Deviation-band and model-divergence checks on the latest observation.
///
/// - Lower band: latest < mean - k * std (sample std over the window)
/// - Upper band (opt-in): latest > mean + k * std
/// - Divergence: |predicted - observed| / observed > tolerance
///
/// Pure and synchronous. At most one band alert and one divergence alert per call.
pub struct OpportunityDetector {
    settings: DetectorSettings,
}

impl OpportunityDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Evaluate `window` (oldest first; the last element is the latest observation).
    pub fn evaluate(&self, window: &[Observation], model: Option<&Model>) -> Vec<Alert> {
        let Some(latest) = window.last() else {
            return Vec::new();
        };
        if window.len() < self.settings.min_detect_samples {
            debug!(
                "Detector: {} of {} samples, skipping",
                window.len(),
                self.settings.min_detect_samples
            );
            return Vec::new();
        }

        let data = Data::new(window.iter().map(|o| o.primary_value()).collect::<Vec<_>>());
        let (Some(mean), Some(std_dev)) = (data.mean(), data.std_dev()) else {
            return Vec::new();
        };
        if !std_dev.is_finite() || std_dev == 0.0 {
            return Vec::new();
        }

        let observed = latest.primary_value();
        let band = self.settings.deviation_multiplier_k * std_dev;
        let lower = mean - band;
        let upper = mean + band;
        let predicted = model.and_then(|m| m.predict(latest.auxiliary_values()));

        debug!(
            "Detector: latest={:.4} mean={:.4} std={:.4} band=[{:.4}, {:.4}] predicted={:?}",
            observed, mean, std_dev, lower, upper, predicted
        );

        let mut alerts = Vec::new();

        if observed < lower {
            alerts.push(Alert::new(
                DeviationKind::BelowThreshold,
                latest.timestamp(),
                observed,
                predicted,
                lower,
            ));
        } else if self.settings.alert_on_upper_band && observed > upper {
            alerts.push(Alert::new(
                DeviationKind::AboveThreshold,
                latest.timestamp(),
                observed,
                predicted,
                upper,
            ));
        }

        if let Some(predicted) = predicted
            && (predicted - observed).abs() / observed > self.settings.model_divergence_tolerance
        {
            alerts.push(Alert::new(
                DeviationKind::ModelDivergence,
                latest.timestamp(),
                observed,
                Some(predicted),
                predicted,
            ));
        }

        alerts
    }
}
