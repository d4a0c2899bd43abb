use crate::domain::errors::ObservationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped sample of the tracked price plus its auxiliary signals
/// (exchange rate, news sentiment, ...).
///
/// Fields are read-only: an observation is never mutated after construction,
/// and the store only ever appends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObservation")]
pub struct Observation {
    timestamp: DateTime<Utc>,
    primary_value: f64,
    auxiliary_values: Vec<f64>,
}

/// Wire shape, validated through `Observation::new` on the way in
#[derive(Deserialize)]
struct RawObservation {
    timestamp: DateTime<Utc>,
    primary_value: f64,
    auxiliary_values: Vec<f64>,
}

impl TryFrom<RawObservation> for Observation {
    type Error = ObservationError;

    fn try_from(raw: RawObservation) -> Result<Self, Self::Error> {
        Observation::new(raw.timestamp, raw.primary_value, raw.auxiliary_values)
    }
}

impl Observation {
    /// Build a validated observation. The timestamp is truncated to whole seconds.
    pub fn new(
        timestamp: DateTime<Utc>,
        primary_value: f64,
        auxiliary_values: Vec<f64>,
    ) -> Result<Self, ObservationError> {
        if !primary_value.is_finite() || primary_value <= 0.0 {
            return Err(ObservationError::InvalidPrimary(primary_value));
        }
        if let Some(index) = auxiliary_values.iter().position(|v| !v.is_finite()) {
            return Err(ObservationError::NonFiniteAuxiliary { index });
        }

        let timestamp = DateTime::from_timestamp(timestamp.timestamp(), 0).unwrap_or(timestamp);

        Ok(Self {
            timestamp,
            primary_value,
            auxiliary_values,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn primary_value(&self) -> f64 {
        self.primary_value
    }

    pub fn auxiliary_values(&self) -> &[f64] {
        &self.auxiliary_values
    }

    pub fn arity(&self) -> usize {
        self.auxiliary_values.len()
    }
}
