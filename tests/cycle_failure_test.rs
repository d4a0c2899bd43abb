mod support;

use async_trait::async_trait;
use chrono::TimeDelta;
use goldwatch::application::scheduler::{CycleOutcome, TrainingOutcome};
use goldwatch::domain::errors::{ArtifactError, FetchError};
use goldwatch::domain::ml::{LinearParameters, Model, ValidationMetrics};
use goldwatch::domain::repositories::{ModelArtifactStore, ObservationRepository};
use goldwatch::infrastructure::InMemoryObservationRepository;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use support::{CountingFitter, Harness, ScriptedSource, linear_observation, t0};

fn stale_model(version: u64) -> Model {
    Model {
        version,
        trained_at: t0() - TimeDelta::days(3),
        feature_spec: vec![0],
        parameters: LinearParameters {
            intercept: 1500.0,
            coefficients: vec![28.0],
        },
        validation: ValidationMetrics {
            train_samples: 40,
            validation_samples: 10,
            rmse: Some(12.0),
            mae: Some(9.0),
        },
    }
}

async fn seeded_repository(rows: usize) -> Arc<InMemoryObservationRepository> {
    let repository = Arc::new(InMemoryObservationRepository::new(2));
    for i in 0..rows {
        repository.append(&linear_observation(i)).await.unwrap();
    }
    repository
}

#[tokio::test]
async fn test_fetch_error_touches_nothing() {
    let repository = seeded_repository(40).await;
    let harness = Harness::new(repository.clone(), CountingFitter::working());

    let source = Arc::new(ScriptedSource::default());
    source.push(Err(FetchError::Unavailable {
        source_name: "scripted".to_string(),
        reason: "HTTP 502".to_string(),
    }));
    let cycle = harness.cycle(source, 6);

    let report = cycle.run_at(t0()).await;

    assert_eq!(report.outcome, CycleOutcome::FetchFailed);
    assert_eq!(report.training, TrainingOutcome::NotAttempted);
    assert!(report.alerts.is_empty());
    assert_eq!(repository.count().await.unwrap(), 40);
    assert_eq!(harness.alert_count(), 0);
    // Training was due (40 rows, no model) but never attempted
    assert_eq!(harness.fitter.calls.load(Ordering::SeqCst), 0);
    assert!(harness.slot.current().is_none());
}

#[tokio::test]
async fn test_failed_training_keeps_current_model() {
    let repository = seeded_repository(40).await;
    let harness = Harness::new(repository.clone(), CountingFitter::failing());
    harness.slot.publish(stale_model(3)).unwrap();
    let before = harness.slot.current().unwrap();

    let source = Arc::new(ScriptedSource::default());
    source.push(Ok(linear_observation(40)));
    let report = harness.cycle(source, 6).run_at(t0()).await;

    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert!(matches!(report.training, TrainingOutcome::Failed { .. }));
    assert_eq!(harness.fitter.calls.load(Ordering::SeqCst), 1);

    let after = harness.slot.current().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(*after, stale_model(3));
    assert!(harness.artifacts.load().await.unwrap().is_none());
    assert_eq!(repository.count().await.unwrap(), 41);
}

#[tokio::test]
async fn test_successful_training_persists_then_publishes() {
    let repository = seeded_repository(40).await;
    let harness = Harness::new(repository, CountingFitter::working());
    harness.slot.publish(stale_model(3)).unwrap();

    let source = Arc::new(ScriptedSource::default());
    source.push(Ok(linear_observation(40)));
    let report = harness.cycle(source, 6).run_at(t0()).await;

    assert_eq!(report.published_version(), Some(4));
    assert_eq!(harness.slot.version(), Some(4));
    let persisted = harness.artifacts.load().await.unwrap().unwrap();
    assert_eq!(persisted.version, 4);
    assert_eq!(persisted.trained_at, t0());
    assert_eq!(persisted.feature_spec, vec![0, 1]);
}

struct BrokenArtifacts;

#[async_trait]
impl ModelArtifactStore for BrokenArtifacts {
    async fn load(&self) -> Result<Option<Model>, ArtifactError> {
        Ok(None)
    }

    async fn save(&self, _model: &Model) -> Result<(), ArtifactError> {
        Err(ArtifactError::Io {
            path: "/readonly/model.json".to_string(),
            reason: "permission denied".to_string(),
        })
    }
}

#[tokio::test]
async fn test_persist_failure_keeps_current_model() {
    let repository = seeded_repository(40).await;
    let mut harness = Harness::new(repository, CountingFitter::working());
    harness.artifacts = Arc::new(BrokenArtifacts);
    harness.slot.publish(stale_model(3)).unwrap();
    let before = harness.slot.current().unwrap();

    let source = Arc::new(ScriptedSource::default());
    source.push(Ok(linear_observation(40)));
    let report = harness.cycle(source, 6).run_at(t0()).await;

    assert!(matches!(report.training, TrainingOutcome::PersistFailed { .. }));
    assert!(Arc::ptr_eq(&before, &harness.slot.current().unwrap()));
}

#[tokio::test]
async fn test_below_min_samples_never_trains() {
    let repository = seeded_repository(10).await;
    let harness = Harness::new(repository, CountingFitter::working());

    let source = Arc::new(ScriptedSource::default());
    source.push(Ok(linear_observation(10)));
    let report = harness.cycle(source, 6).run_at(t0()).await;

    assert_eq!(report.training, TrainingOutcome::NotDue);
    assert_eq!(harness.fitter.calls.load(Ordering::SeqCst), 0);
    assert!(harness.slot.current().is_none());
}
