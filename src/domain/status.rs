use crate::domain::market::Observation;
use serde::Serialize;
use std::fmt;

/// Point-in-time answer to a status query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Status {
    /// The store is empty; a model may still have been loaded from disk.
    NoData { model_version: Option<u64> },
    Snapshot {
        last_observation: Observation,
        model_version: Option<u64>,
        observation_count: usize,
    },
}

impl Status {
    pub fn model_version(&self) -> Option<u64> {
        match self {
            Status::NoData { model_version } | Status::Snapshot { model_version, .. } => {
                *model_version
            }
        }
    }

    pub fn observation_count(&self) -> usize {
        match self {
            Status::NoData { .. } => 0,
            Status::Snapshot {
                observation_count, ..
            } => *observation_count,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = |v: &Option<u64>| match v {
            Some(version) => format!("v{}", version),
            None => "none".to_string(),
        };

        match self {
            Status::NoData { model_version } => {
                write!(f, "No data yet. Model: {}", model(model_version))
            }
            Status::Snapshot {
                last_observation,
                model_version,
                observation_count,
            } => {
                let aux = last_observation
                    .auxiliary_values()
                    .iter()
                    .map(|v| format!("{:.4}", v))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "Last observation {} | Price: {:.2} | Signals: [{}] | Observations: {} | Model: {}",
                    last_observation.timestamp().format("%Y-%m-%d %H:%M:%S"),
                    last_observation.primary_value(),
                    aux,
                    observation_count,
                    model(model_version)
                )
            }
        }
    }
}
