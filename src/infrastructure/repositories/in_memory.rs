//! In-Memory Repository Implementations
//!
//! Thread-safe, in-memory implementations of the repository traits defined
//! in `domain::repositories`.
//!
//! # Features
//!
//! - **Thread-safe**: Uses `RwLock` for concurrent access (one writer, many readers)
//! - **Testing**: Ideal for unit tests and development
//!
//! # Limitations
//!
//! - Data is lost on application restart
//! - Limited by available RAM

use crate::domain::errors::{ArtifactError, StoreError};
use crate::domain::market::Observation;
use crate::domain::ml::Model;
use crate::domain::repositories::{ModelArtifactStore, ObservationRepository};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory implementation of ObservationRepository
pub struct InMemoryObservationRepository {
    observations: RwLock<Vec<Observation>>,
    auxiliary_arity: usize,
}

impl InMemoryObservationRepository {
    pub fn new(auxiliary_arity: usize) -> Self {
        Self {
            observations: RwLock::new(Vec::new()),
            auxiliary_arity,
        }
    }
}

#[async_trait]
impl ObservationRepository for InMemoryObservationRepository {
    async fn append(&self, observation: &Observation) -> Result<(), StoreError> {
        if observation.arity() != self.auxiliary_arity {
            return Err(StoreError::ArityMismatch {
                expected: self.auxiliary_arity,
                actual: observation.arity(),
            });
        }
        let mut observations = self.observations.write().await;
        if let Some(latest) = observations.last()
            && latest.timestamp() > observation.timestamp()
        {
            return Err(StoreError::OutOfOrder {
                latest: latest.timestamp(),
                offered: observation.timestamp(),
            });
        }
        observations.push(observation.clone());
        Ok(())
    }

    async fn recent(&self, n: usize) -> Result<Vec<Observation>, StoreError> {
        let observations = self.observations.read().await;
        let start = observations.len().saturating_sub(n);
        Ok(observations[start..].to_vec())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.observations.read().await.len())
    }

    async fn latest(&self) -> Result<Option<Observation>, StoreError> {
        Ok(self.observations.read().await.last().cloned())
    }
}

/// In-memory model slot
#[derive(Default)]
pub struct InMemoryModelArtifactStore {
    model: RwLock<Option<Model>>,
}

impl InMemoryModelArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelArtifactStore for InMemoryModelArtifactStore {
    async fn load(&self) -> Result<Option<Model>, ArtifactError> {
        Ok(self.model.read().await.clone())
    }

    async fn save(&self, model: &Model) -> Result<(), ArtifactError> {
        *self.model.write().await = Some(model.clone());
        Ok(())
    }
}
