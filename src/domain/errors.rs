use chrono::{DateTime, Utc};
use thiserror::Error;

/// Rejected observation values
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObservationError {
    #[error("Primary value must be positive and finite, got {0}")]
    InvalidPrimary(f64),

    #[error("Auxiliary value at index {index} is not finite")]
    NonFiniteAuxiliary { index: usize },
}

/// Errors raised by the data acquisition port
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Upstream unavailable ({source_name}): {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("Malformed observation from {source_name}: {reason}")]
    Malformed { source_name: String, reason: String },

    #[error("Acquisition timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("All {attempts} sources failed; last error: {last}")]
    Exhausted { attempts: usize, last: String },
}

/// Errors raised by the observation store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O failure during {operation}: {reason}")]
    Io { operation: String, reason: String },

    #[error("Corrupt observation row {row_id}: {reason}")]
    Corrupt { row_id: i64, reason: String },

    #[error("Auxiliary arity mismatch: expected {expected}, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Observation at {offered} is older than the latest stored at {latest}")]
    OutOfOrder {
        latest: DateTime<Utc>,
        offered: DateTime<Utc>,
    },
}

impl StoreError {
    pub fn io(operation: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Io {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Errors raised while fitting a regression model
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainError {
    #[error("Insufficient data: {available} rows, need at least {required}")]
    InsufficientData { available: usize, required: usize },

    #[error("Insufficient variance: {reason}")]
    InsufficientVariance { reason: String },

    #[error("Numerical failure: {reason}")]
    NumericalFailure { reason: String },
}

/// Errors raised by the notifier port
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery via {notifier} failed: {reason}")]
    Delivery { notifier: String, reason: String },

    #[error("Alert channel closed")]
    ChannelClosed,

    #[error("Alert channel full (capacity {capacity})")]
    ChannelFull { capacity: usize },
}

/// Errors raised by the model artifact slot
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact I/O failure at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Artifact serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Artifact at {path} is unreadable after write: {reason}")]
    Unreadable { path: String, reason: String },
}
