use crate::application::detection::OpportunityDetector;
use crate::application::ml::{ModelSlot, ModelTrainer};
use crate::config::Config;
use crate::domain::errors::FetchError;
use crate::domain::market::{Alert, Observation};
use crate::domain::ports::{Notifier, ObservationSource};
use crate::domain::repositories::{ModelArtifactStore, ObservationRepository};
use crate::infrastructure::observability::Metrics;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub acquisition_timeout: Duration,
    pub training_window: usize,
    pub detection_window: usize,
}

impl From<&Config> for CycleSettings {
    fn from(config: &Config) -> Self {
        Self {
            acquisition_timeout: config.schedule.acquisition_timeout,
            training_window: config.model.training_window,
            detection_window: config.detection.detection_window,
        }
    }
}

/// Everything a cycle talks to, created once at startup
pub struct CycleComponents {
    pub source: Arc<dyn ObservationSource>,
    pub repository: Arc<dyn ObservationRepository>,
    pub artifacts: Arc<dyn ModelArtifactStore>,
    pub slot: Arc<ModelSlot>,
    pub trainer: ModelTrainer,
    pub detector: OpportunityDetector,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Metrics,
}

/// How far a cycle got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    FetchFailed,
    StoreFailed,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Completed => "completed",
            CycleOutcome::FetchFailed => "fetch_failed",
            CycleOutcome::StoreFailed => "store_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainingOutcome {
    /// The cycle stopped before the training phase
    NotAttempted,
    NotDue,
    Published { version: u64 },
    /// Fitting failed or history could not be read; the old model stays
    Failed { reason: String },
    /// Fitted, but the artifact could not be saved; the old model stays
    PersistFailed { reason: String },
}

impl TrainingOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            TrainingOutcome::NotAttempted => "not_attempted",
            TrainingOutcome::NotDue => "not_due",
            TrainingOutcome::Published { .. } => "published",
            TrainingOutcome::Failed { .. } => "failed",
            TrainingOutcome::PersistFailed { .. } => "persist_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub observation: Option<Observation>,
    pub training: TrainingOutcome,
    pub alerts: Vec<Alert>,
    pub notify_failures: usize,
}

impl CycleReport {
    fn stopped(started_at: DateTime<Utc>, outcome: CycleOutcome) -> Self {
        Self {
            started_at,
            outcome,
            observation: None,
            training: TrainingOutcome::NotAttempted,
            alerts: Vec::new(),
            notify_failures: 0,
        }
    }

    pub fn published_version(&self) -> Option<u64> {
        match self.training {
            TrainingOutcome::Published { version } => Some(version),
            _ => None,
        }
    }
}

/// One acquire, store, train, detect, notify pass.
///
/// Every failure is contained here: the cycle logs it with its phase,
/// records it in the report, and returns normally.
pub struct MonitorCycle {
    components: CycleComponents,
    settings: CycleSettings,
}

impl MonitorCycle {
    pub fn new(components: CycleComponents, settings: CycleSettings) -> Self {
        Self {
            components,
            settings,
        }
    }

    pub fn slot(&self) -> &Arc<ModelSlot> {
        &self.components.slot
    }

    pub async fn run_once(&self) -> CycleReport {
        self.run_at(Utc::now()).await
    }

    /// Run a cycle with an explicit clock reading for the retrain gate
    pub async fn run_at(&self, now: DateTime<Utc>) -> CycleReport {
        let c = &self.components;

        let observation = match self.acquire().await {
            Ok(observation) => observation,
            Err(e) => {
                error!(phase = "fetch", source = c.source.name(), "Cycle aborted: {}", e);
                return self.finish(CycleReport::stopped(now, CycleOutcome::FetchFailed));
            }
        };

        if let Err(e) = c.repository.append(&observation).await {
            error!(phase = "store", "Cycle aborted: {}", e);
            return self.finish(CycleReport::stopped(now, CycleOutcome::StoreFailed));
        }
        c.metrics.last_price.set(observation.primary_value());
        debug!(
            "Stored observation {} price={:.4}",
            observation.timestamp(),
            observation.primary_value()
        );

        let training = self.train_phase(now).await;
        let alerts = self.detect_phase().await;
        let notify_failures = self.notify_phase(&alerts).await;

        self.finish(CycleReport {
            started_at: now,
            outcome: CycleOutcome::Completed,
            observation: Some(observation),
            training,
            alerts,
            notify_failures,
        })
    }

    async fn acquire(&self) -> Result<Observation, FetchError> {
        let source = &self.components.source;
        let _timer = self.components.metrics.fetch_timer(source.name());

        // Dropping the fetch future on timeout abandons the request
        match tokio::time::timeout(self.settings.acquisition_timeout, source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                duration_ms: self.settings.acquisition_timeout.as_millis() as u64,
            }),
        }
    }

    async fn train_phase(&self, now: DateTime<Utc>) -> TrainingOutcome {
        let c = &self.components;
        let current = c.slot.current();

        let history = match c.repository.recent(self.settings.training_window).await {
            Ok(history) => history,
            Err(e) => {
                warn!(phase = "train", "Could not read training history: {}", e);
                return TrainingOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let model = match c.trainer.maybe_retrain(&history, current.as_deref(), now) {
            Ok(None) => return TrainingOutcome::NotDue,
            Ok(Some(model)) => model,
            Err(e) => {
                warn!(
                    phase = "train",
                    "Training failed, keeping model {:?}: {}",
                    current.as_ref().map(|m| m.version),
                    e
                );
                return TrainingOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        // Persist first so a restart resumes from the model actually in use
        if let Err(e) = c.artifacts.save(&model).await {
            error!(
                phase = "train",
                "Could not persist model v{}, keeping previous: {}", model.version, e
            );
            return TrainingOutcome::PersistFailed {
                reason: e.to_string(),
            };
        }

        match c.slot.publish(model) {
            Ok(published) => {
                info!(
                    "Published model v{} (validation rmse: {:?})",
                    published.version, published.validation.rmse
                );
                TrainingOutcome::Published {
                    version: published.version,
                }
            }
            Err(e) => {
                error!(phase = "train", "Model not published: {}", e);
                TrainingOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn detect_phase(&self) -> Vec<Alert> {
        let c = &self.components;
        let window = match c.repository.recent(self.settings.detection_window).await {
            Ok(window) => window,
            Err(e) => {
                warn!(phase = "detect", "Could not read detection window: {}", e);
                return Vec::new();
            }
        };

        let model = c.slot.current();
        c.detector.evaluate(&window, model.as_deref())
    }

    async fn notify_phase(&self, alerts: &[Alert]) -> usize {
        let c = &self.components;
        let mut failures = 0;
        for alert in alerts {
            c.metrics.inc_alert(alert.deviation_kind.as_str());
            info!(kind = %alert.deviation_kind, "Opportunity: {}", alert);

            if let Err(e) = c.notifier.notify(alert).await {
                warn!(
                    phase = "notify",
                    notifier = c.notifier.name(),
                    "Alert {} not delivered: {}",
                    alert.id,
                    e
                );
                c.metrics.notify_failures_total.inc();
                failures += 1;
            }
        }
        failures
    }

    fn finish(&self, report: CycleReport) -> CycleReport {
        let metrics = &self.components.metrics;
        metrics.inc_cycle(report.outcome.as_str());
        if report.training != TrainingOutcome::NotAttempted {
            metrics.inc_training(report.training.as_str());
        }
        if let Some(version) = self.components.slot.version() {
            metrics.model_version.set(version as f64);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::detection::DetectorSettings;
    use crate::application::ml::{SmartcoreLinearFitter, TrainerSettings};
    use crate::infrastructure::notifiers::ChannelNotifier;
    use crate::infrastructure::repositories::{
        InMemoryModelArtifactStore, InMemoryObservationRepository,
    };
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use std::sync::Mutex;

    /// Replays a fixed list of prices, then fails
    struct Scripted {
        prices: Mutex<Vec<f64>>,
    }

    #[async_trait]
    impl ObservationSource for Scripted {
        async fn fetch(&self) -> Result<Observation, FetchError> {
            let mut prices = self.prices.lock().unwrap();
            if prices.is_empty() {
                return Err(FetchError::Unavailable {
                    source_name: "scripted".to_string(),
                    reason: "script exhausted".to_string(),
                });
            }
            let price = prices.remove(0);
            Ok(Observation::new(Utc::now(), price, vec![price / 80.0, 0.0]).unwrap())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct Hanging;

    #[async_trait]
    impl ObservationSource for Hanging {
        async fn fetch(&self) -> Result<Observation, FetchError> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    fn cycle(
        source: Arc<dyn ObservationSource>,
        repository: Arc<InMemoryObservationRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> MonitorCycle {
        MonitorCycle::new(
            CycleComponents {
                source,
                repository,
                artifacts: Arc::new(InMemoryModelArtifactStore::new()),
                slot: Arc::new(ModelSlot::new()),
                trainer: ModelTrainer::new(
                    Arc::new(SmartcoreLinearFitter),
                    TrainerSettings {
                        min_train_samples: 20,
                        retrain_interval: TimeDelta::hours(24),
                        validation_fraction: 0.2,
                    },
                ),
                detector: OpportunityDetector::new(DetectorSettings {
                    min_detect_samples: 6,
                    deviation_multiplier_k: 0.5,
                    model_divergence_tolerance: 0.01,
                    alert_on_upper_band: false,
                }),
                notifier,
                metrics: Metrics::new().unwrap(),
            },
            CycleSettings {
                acquisition_timeout: Duration::from_millis(50),
                training_window: 100,
                detection_window: 6,
            },
        )
    }

    #[tokio::test]
    async fn test_alert_reaches_notifier() {
        let prices = vec![100.0, 102.0, 98.0, 101.0, 99.0, 97.0];
        let repository = Arc::new(InMemoryObservationRepository::new(2));
        let (notifier, mut rx) = ChannelNotifier::new(8);
        let cycle = cycle(
            Arc::new(Scripted {
                prices: Mutex::new(prices),
            }),
            repository.clone(),
            Arc::new(notifier),
        );

        let mut last = None;
        for _ in 0..6 {
            last = Some(cycle.run_once().await);
        }
        let report = last.unwrap();

        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.training, TrainingOutcome::NotDue);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(rx.try_recv().unwrap().observed_value, 97.0);
        assert_eq!(repository.count().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_timeout_stores_nothing() {
        let repository = Arc::new(InMemoryObservationRepository::new(2));
        let (notifier, _rx) = ChannelNotifier::new(8);
        let cycle = cycle(Arc::new(Hanging), repository.clone(), Arc::new(notifier));

        let report = cycle.run_once().await;
        assert_eq!(report.outcome, CycleOutcome::FetchFailed);
        assert_eq!(report.training, TrainingOutcome::NotAttempted);
        assert_eq!(repository.count().await.unwrap(), 0);
        assert_eq!(cycle.components.metrics.cycle_count("fetch_failed"), 1);
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_cycle() {
        let prices = vec![100.0, 102.0, 98.0, 101.0, 99.0, 97.0];
        let repository = Arc::new(InMemoryObservationRepository::new(2));
        let (notifier, rx) = ChannelNotifier::new(8);
        drop(rx);
        let cycle = cycle(
            Arc::new(Scripted {
                prices: Mutex::new(prices),
            }),
            repository,
            Arc::new(notifier),
        );

        let mut last = None;
        for _ in 0..6 {
            last = Some(cycle.run_once().await);
        }
        let report = last.unwrap();
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.notify_failures, 1);
    }
}
