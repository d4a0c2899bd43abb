mod support;

use goldwatch::application::scheduler::CycleOutcome;
use goldwatch::domain::market::DeviationKind;
use goldwatch::domain::repositories::ObservationRepository;
use goldwatch::infrastructure::InMemoryObservationRepository;
use std::sync::Arc;
use support::{CountingFitter, Harness, ScriptedSource};

async fn run_script(prices: &[f64]) -> Harness {
    let repository: Arc<dyn ObservationRepository> = Arc::new(InMemoryObservationRepository::new(2));
    let harness = Harness::new(repository, CountingFitter::working());
    let cycle = harness.cycle(Arc::new(ScriptedSource::with_prices(prices)), 6);

    for _ in prices {
        assert_eq!(cycle.run_once().await.outcome, CycleOutcome::Completed);
    }
    harness
}

#[tokio::test]
async fn test_drop_below_band_raises_one_alert() {
    let harness = run_script(&[100.0, 102.0, 98.0, 101.0, 99.0, 97.0]).await;

    let alerts = harness.notifier.alerts.lock().unwrap().clone();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].deviation_kind, DeviationKind::BelowThreshold);
    assert_eq!(alerts[0].observed_value, 97.0);
    assert!((alerts[0].reference_value - 98.5646).abs() < 1e-3);
    assert_eq!(harness.metrics.alert_count("below_threshold"), 1);
}

#[tokio::test]
async fn test_same_values_ending_inside_band_stay_quiet() {
    let harness = run_script(&[100.0, 102.0, 98.0, 101.0, 97.0, 99.0]).await;
    assert_eq!(harness.alert_count(), 0);
}

#[tokio::test]
async fn test_short_history_stays_quiet() {
    let harness = run_script(&[100.0, 102.0, 98.0, 101.0, 90.0]).await;
    assert_eq!(harness.alert_count(), 0);
}
