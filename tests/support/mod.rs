#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeDelta, TimeZone, Utc};
use goldwatch::application::detection::{DetectorSettings, OpportunityDetector};
use goldwatch::application::ml::{
    ModelSlot, ModelTrainer, RegressionFitter, SmartcoreLinearFitter, TrainerSettings,
};
use goldwatch::application::scheduler::{CycleComponents, CycleSettings, MonitorCycle};
use goldwatch::domain::errors::{FetchError, NotifyError, TrainError};
use goldwatch::domain::market::{Alert, Observation};
use goldwatch::domain::ml::LinearParameters;
use goldwatch::domain::ports::{Notifier, ObservationSource};
use goldwatch::domain::repositories::{ModelArtifactStore, ObservationRepository};
use goldwatch::infrastructure::observability::Metrics;
use goldwatch::infrastructure::repositories::InMemoryModelArtifactStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

/// price = 1500 + 28 * usd_try + 40 * sentiment
pub fn linear_observation(i: usize) -> Observation {
    let usd_try = 30.0 + (i as f64) * 0.05;
    let sentiment = ((i * 7) % 11) as f64 / 10.0 - 0.5;
    Observation::new(
        t0() + ChronoDuration::seconds(i as i64 * 300),
        1500.0 + 28.0 * usd_try + 40.0 * sentiment,
        vec![usd_try, sentiment],
    )
    .unwrap()
}

/// Hands out queued results in order; fails once the queue is empty
#[derive(Default)]
pub struct ScriptedSource {
    queue: Mutex<VecDeque<Result<Observation, FetchError>>>,
    pub calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn with_prices(prices: &[f64]) -> Self {
        let source = Self::default();
        for (i, price) in prices.iter().enumerate() {
            source.push(Ok(Observation::new(
                t0() + ChronoDuration::seconds(i as i64 * 300),
                *price,
                vec![32.0, 0.0],
            )
            .unwrap()));
        }
        source
    }

    pub fn push(&self, result: Result<Observation, FetchError>) {
        self.queue.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl ObservationSource for ScriptedSource {
    async fn fetch(&self) -> Result<Observation, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(FetchError::Unavailable {
                    source_name: "scripted".to_string(),
                    reason: "script exhausted".to_string(),
                })
            })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Blocks every fetch until `release` is notified
pub struct GatedSource {
    pub gate: Notify,
    pub entered: Notify,
}

impl GatedSource {
    pub fn new() -> Self {
        Self {
            gate: Notify::new(),
            entered: Notify::new(),
        }
    }
}

#[async_trait]
impl ObservationSource for GatedSource {
    async fn fetch(&self) -> Result<Observation, FetchError> {
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(Observation::new(Utc::now(), 2400.0, vec![32.0, 0.0]).unwrap())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<Alert>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Counts calls and optionally fails them
pub struct CountingFitter {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl CountingFitter {
    pub fn working() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }
}

impl RegressionFitter for CountingFitter {
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<LinearParameters, TrainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TrainError::NumericalFailure {
                reason: "injected".to_string(),
            });
        }
        SmartcoreLinearFitter.fit(features, targets)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

pub struct Harness {
    pub repository: Arc<dyn ObservationRepository>,
    pub artifacts: Arc<dyn ModelArtifactStore>,
    pub slot: Arc<ModelSlot>,
    pub notifier: Arc<RecordingNotifier>,
    pub fitter: Arc<CountingFitter>,
    pub metrics: Metrics,
}

impl Harness {
    pub fn new(repository: Arc<dyn ObservationRepository>, fitter: CountingFitter) -> Self {
        Self {
            repository,
            artifacts: Arc::new(InMemoryModelArtifactStore::new()),
            slot: Arc::new(ModelSlot::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            fitter: Arc::new(fitter),
            metrics: Metrics::new().unwrap(),
        }
    }

    pub fn cycle(&self, source: Arc<dyn ObservationSource>, min_detect_samples: usize) -> MonitorCycle {
        MonitorCycle::new(
            CycleComponents {
                source,
                repository: self.repository.clone(),
                artifacts: self.artifacts.clone(),
                slot: self.slot.clone(),
                trainer: ModelTrainer::new(
                    self.fitter.clone(),
                    TrainerSettings {
                        min_train_samples: 20,
                        retrain_interval: TimeDelta::hours(24),
                        validation_fraction: 0.2,
                    },
                ),
                detector: OpportunityDetector::new(DetectorSettings {
                    min_detect_samples,
                    deviation_multiplier_k: 0.5,
                    model_divergence_tolerance: 0.01,
                    alert_on_upper_band: false,
                }),
                notifier: self.notifier.clone(),
                metrics: self.metrics.clone(),
            },
            CycleSettings {
                acquisition_timeout: Duration::from_secs(2),
                training_window: 500,
                detection_window: min_detect_samples,
            },
        )
    }

    pub fn alert_count(&self) -> usize {
        self.notifier.alerts.lock().unwrap().len()
    }
}
