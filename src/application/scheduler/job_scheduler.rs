use super::cycle::{CycleReport, MonitorCycle};
use crate::infrastructure::observability::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, warn};

pub enum TickOutcome {
    Started(JoinHandle<CycleReport>),
    /// A cycle was still running; nothing was queued
    Skipped,
}

/// Fires the monitor cycle on a fixed interval, never two at once.
///
/// The cycle sits behind an async mutex. A tick that cannot take the lock
/// immediately is dropped, so a slow cycle delays nothing and piles nothing up.
pub struct JobScheduler {
    cycle: Arc<Mutex<MonitorCycle>>,
    interval: Duration,
    metrics: Metrics,
}

impl JobScheduler {
    pub fn new(cycle: MonitorCycle, interval: Duration, metrics: Metrics) -> Self {
        Self {
            cycle: Arc::new(Mutex::new(cycle)),
            interval,
            metrics,
        }
    }

    pub fn is_running(&self) -> bool {
        self.cycle.try_lock().is_err()
    }

    /// Start a cycle unless one is already in flight
    pub fn tick(&self) -> TickOutcome {
        match self.cycle.clone().try_lock_owned() {
            Ok(cycle) => TickOutcome::Started(tokio::spawn(async move {
                // The guard lives until the cycle returns
                cycle.run_once().await
            })),
            Err(_) => {
                warn!("Previous cycle still running, skipping this tick");
                self.metrics.ticks_skipped_total.inc();
                TickOutcome::Skipped
            }
        }
    }

    /// Tick every interval until `shutdown` flips, then wait for the cycle in flight.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("JobScheduler started (interval: {:?})", self.interval);

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    if let TickOutcome::Started(handle) = self.tick() {
                        tokio::spawn(async move {
                            if let Err(e) = handle.await {
                                error!("Monitor cycle task failed: {}", e);
                            }
                        });
                    }
                }
            }
        }

        info!("JobScheduler stopping, waiting for in-flight cycle...");
        let _idle = self.cycle.lock().await;
        info!("JobScheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::detection::{DetectorSettings, OpportunityDetector};
    use crate::application::ml::{ModelSlot, ModelTrainer, SmartcoreLinearFitter, TrainerSettings};
    use crate::application::scheduler::cycle::{CycleComponents, CycleSettings};
    use crate::domain::errors::FetchError;
    use crate::domain::market::Observation;
    use crate::domain::ports::ObservationSource;
    use crate::domain::repositories::ObservationRepository;
    use crate::infrastructure::notifiers::LogNotifier;
    use crate::infrastructure::repositories::{
        InMemoryModelArtifactStore, InMemoryObservationRepository,
    };
    use async_trait::async_trait;
    use chrono::{TimeDelta, Utc};

    struct Steady;

    #[async_trait]
    impl ObservationSource for Steady {
        async fn fetch(&self) -> Result<Observation, FetchError> {
            Ok(Observation::new(Utc::now(), 2400.0, vec![32.0, 0.0]).unwrap())
        }

        fn name(&self) -> &str {
            "steady"
        }
    }

    fn scheduler(repository: Arc<InMemoryObservationRepository>, interval: Duration) -> JobScheduler {
        let metrics = Metrics::new().unwrap();
        let cycle = MonitorCycle::new(
            CycleComponents {
                source: Arc::new(Steady),
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
                    min_detect_samples: 30,
                    deviation_multiplier_k: 0.5,
                    model_divergence_tolerance: 0.01,
                    alert_on_upper_band: false,
                }),
                notifier: Arc::new(LogNotifier),
                metrics: metrics.clone(),
            },
            CycleSettings {
                acquisition_timeout: Duration::from_secs(1),
                training_window: 100,
                detection_window: 30,
            },
        );
        JobScheduler::new(cycle, interval, metrics)
    }

    #[tokio::test]
    async fn test_tick_runs_cycle() {
        let repository = Arc::new(InMemoryObservationRepository::new(2));
        let scheduler = scheduler(repository.clone(), Duration::from_secs(60));

        let TickOutcome::Started(handle) = scheduler.tick() else {
            panic!("first tick should start a cycle");
        };
        handle.await.unwrap();

        assert!(!scheduler.is_running());
        assert_eq!(repository.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let repository = Arc::new(InMemoryObservationRepository::new(2));
        let scheduler = Arc::new(scheduler(repository.clone(), Duration::from_millis(10)));
        let (tx, rx) = watch::channel(false);

        let runner = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run(rx).await })
        };

        tokio::time::sleep(Duration::from_millis(55)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), runner)
            .await
            .unwrap()
            .unwrap();

        let stored = repository.count().await.unwrap();
        assert!(stored >= 1);
        // Nothing runs after shutdown
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(repository.count().await.unwrap(), stored);
    }
}
