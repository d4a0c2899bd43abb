//! Repository Pattern Abstractions
//!
//! Persistence seams for the monitor:
//! - `ObservationRepository`: append-only observation history
//! - `ModelArtifactStore`: the single slot holding the current model
//!
//! # Concurrency
//!
//! Only the scheduler cycle appends. Any number of readers (status queries,
//! the detector, the trainer) may call `recent`/`count`/`latest` concurrently
//! with an append and always see a consistent prefix of the history.
//!
//! # Example
//!
//! ```rust,no_run
//! use goldwatch::domain::repositories::ObservationRepository;
//! use goldwatch::infrastructure::InMemoryObservationRepository;
//!
//! # async {
//! let repo = InMemoryObservationRepository::new(2);
//! // repo.append(&observation).await?;
//! // let window = repo.recent(30).await?;
//! # };
//! ```

use crate::domain::errors::{ArtifactError, StoreError};
use crate::domain::market::Observation;
use crate::domain::ml::Model;
use async_trait::async_trait;

/// Append-only observation history
#[async_trait]
pub trait ObservationRepository: Send + Sync {
    /// Append one observation. Duplicate timestamps are accepted.
    async fn append(&self, observation: &Observation) -> Result<(), StoreError>;

    /// The `n` most recent observations in insertion order (oldest first)
    async fn recent(&self, n: usize) -> Result<Vec<Observation>, StoreError>;

    /// Total number of stored observations
    async fn count(&self) -> Result<usize, StoreError>;

    /// Most recently appended observation
    async fn latest(&self) -> Result<Option<Observation>, StoreError> {
        Ok(self.recent(1).await?.pop())
    }
}

/// Persistent slot holding exactly the current model
#[async_trait]
pub trait ModelArtifactStore: Send + Sync {
    async fn load(&self) -> Result<Option<Model>, ArtifactError>;

    /// Replace the stored model. The previous artifact is only discarded once
    /// the new one has been written and read back successfully.
    async fn save(&self, model: &Model) -> Result<(), ArtifactError>;
}
