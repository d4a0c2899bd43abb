use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Why an alert was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviationKind {
    /// Price fell strictly below `mean - k * std`
    BelowThreshold,
    /// Price rose strictly above `mean + k * std` (optional upper band)
    AboveThreshold,
    /// Model prediction and observed price disagree beyond the tolerance
    ModelDivergence,
}

impl DeviationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviationKind::BelowThreshold => "below_threshold",
            DeviationKind::AboveThreshold => "above_threshold",
            DeviationKind::ModelDivergence => "model_divergence",
        }
    }
}

impl fmt::Display for DeviationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected opportunity. Produced by the detector, handed to the notifier once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub observed_value: f64,
    pub predicted_value: Option<f64>,
    pub deviation_kind: DeviationKind,
    /// Threshold for statistical kinds, prediction for divergence
    pub reference_value: f64,
}

impl Alert {
    pub fn new(
        deviation_kind: DeviationKind,
        timestamp: DateTime<Utc>,
        observed_value: f64,
        predicted_value: Option<f64>,
        reference_value: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            observed_value,
            predicted_value,
            deviation_kind,
            reference_value,
        }
    }

    /// Signed distance of the observed value from the reference, as a fraction of the reference.
    pub fn deviation_pct(&self) -> f64 {
        if self.reference_value == 0.0 {
            return 0.0;
        }
        (self.observed_value - self.reference_value) / self.reference_value
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.deviation_kind {
            DeviationKind::BelowThreshold => write!(
                f,
                "Price {:.2} dropped below the deviation band ({:.2}) at {}",
                self.observed_value,
                self.reference_value,
                self.timestamp.format("%Y-%m-%d %H:%M:%S")
            ),
            DeviationKind::AboveThreshold => write!(
                f,
                "Price {:.2} rose above the deviation band ({:.2}) at {}",
                self.observed_value,
                self.reference_value,
                self.timestamp.format("%Y-%m-%d %H:%M:%S")
            ),
            DeviationKind::ModelDivergence => {
                let direction = if self.reference_value > self.observed_value {
                    "upside"
                } else {
                    "downside"
                };
                write!(
                    f,
                    "Model expects {} ({:.2}) vs observed {:.2} ({:+.2}%)",
                    direction,
                    self.reference_value,
                    self.observed_value,
                    self.deviation_pct() * 100.0
                )
            }
        }
    }
}
