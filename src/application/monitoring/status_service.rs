use crate::application::ml::ModelSlot;
use crate::domain::errors::StoreError;
use crate::domain::repositories::ObservationRepository;
use crate::domain::status::Status;
use std::sync::Arc;

/// Answers status queries from the store and the model slot.
///
/// Never takes the scheduler's lock, so queries run concurrently with a cycle.
pub struct StatusService {
    repository: Arc<dyn ObservationRepository>,
    slot: Arc<ModelSlot>,
}

impl StatusService {
    pub fn new(repository: Arc<dyn ObservationRepository>, slot: Arc<ModelSlot>) -> Self {
        Self { repository, slot }
    }

    pub async fn status(&self) -> Result<Status, StoreError> {
        let model_version = self.slot.version();
        let Some(last_observation) = self.repository.latest().await? else {
            return Ok(Status::NoData { model_version });
        };
        // Read after `latest` so the count always covers that observation
        let observation_count = self.repository.count().await?;

        Ok(Status::Snapshot {
            last_observation,
            model_version,
            observation_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Observation;
    use crate::domain::ml::{LinearParameters, Model, ValidationMetrics};
    use crate::infrastructure::repositories::InMemoryObservationRepository;
    use chrono::Utc;

    #[tokio::test]
    async fn test_empty_store_is_no_data() {
        let service = StatusService::new(
            Arc::new(InMemoryObservationRepository::new(2)),
            Arc::new(ModelSlot::new()),
        );
        assert_eq!(
            service.status().await.unwrap(),
            Status::NoData {
                model_version: None
            }
        );
    }

    #[tokio::test]
    async fn test_snapshot_reports_latest_and_model() {
        let repository = Arc::new(InMemoryObservationRepository::new(2));
        for price in [2400.0, 2405.5] {
            repository
                .append(&Observation::new(Utc::now(), price, vec![32.0, 0.1]).unwrap())
                .await
                .unwrap();
        }
        let slot = Arc::new(ModelSlot::with_model(Model {
            version: 7,
            trained_at: Utc::now(),
            feature_spec: vec![0],
            parameters: LinearParameters {
                intercept: 0.0,
                coefficients: vec![75.0],
            },
            validation: ValidationMetrics {
                train_samples: 20,
                validation_samples: 5,
                rmse: Some(1.0),
                mae: Some(0.8),
            },
        }));

        let status = StatusService::new(repository, slot).status().await.unwrap();
        assert_eq!(status.model_version(), Some(7));
        assert_eq!(status.observation_count(), 2);
        match status {
            Status::Snapshot {
                last_observation, ..
            } => assert_eq!(last_observation.primary_value(), 2405.5),
            other => panic!("expected snapshot, got {:?}", other),
        }
    }
}
