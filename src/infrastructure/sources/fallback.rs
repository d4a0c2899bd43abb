use crate::domain::errors::FetchError;
use crate::domain::market::Observation;
use crate::domain::ports::ObservationSource;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Tries each inner source in order and returns the first observation.
///
/// Only when every source fails does the caller see an error
/// (`FetchError::Exhausted`, carrying the last cause).
pub struct FallbackSource {
    sources: Vec<Arc<dyn ObservationSource>>,
}

impl FallbackSource {
    pub fn new(sources: Vec<Arc<dyn ObservationSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl ObservationSource for FallbackSource {
    async fn fetch(&self) -> Result<Observation, FetchError> {
        let mut last = "no sources configured".to_string();

        for source in &self.sources {
            match source.fetch().await {
                Ok(observation) => return Ok(observation),
                Err(e) => {
                    warn!("FallbackSource: {} failed: {}", source.name(), e);
                    last = e.to_string();
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts: self.sources.len(),
            last,
        })
    }

    fn name(&self) -> &str {
        "fallback"
    }

    /// Known only when every endpoint reports the same arity
    fn auxiliary_arity(&self) -> Option<usize> {
        let first = self.sources.first()?.auxiliary_arity()?;
        self.sources
            .iter()
            .all(|s| s.auxiliary_arity() == Some(first))
            .then_some(first)
    }
}
