use anyhow::{Result, bail};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::application::bootstrap::{PersistenceBootstrap, PersistenceHandle};
use crate::application::detection::{DetectorSettings, OpportunityDetector};
use crate::application::ml::{ModelSlot, ModelTrainer, SmartcoreLinearFitter, TrainerSettings};
use crate::application::monitoring::StatusService;
use crate::application::scheduler::{
    CycleComponents, CycleReport, CycleSettings, JobScheduler, MonitorCycle, TickOutcome,
};
use crate::config::Config;
use crate::domain::ports::{Notifier, ObservationSource};
use crate::infrastructure::observability::{Metrics, MetricsReporter};

/// Handles returned once the background tasks are running
pub struct SystemHandle {
    pub status: Arc<StatusService>,
    pub slot: Arc<ModelSlot>,
    pub metrics: Metrics,
    shutdown_tx: watch::Sender<bool>,
    scheduler_task: JoinHandle<()>,
}

impl SystemHandle {
    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for the scheduler to finish its in-flight cycle and exit
    pub async fn wait(self) -> Result<()> {
        self.scheduler_task.await?;
        Ok(())
    }
}

pub struct Application {
    pub config: Config,
    pub persistence: PersistenceHandle,
    pub slot: Arc<ModelSlot>,
    pub status: Arc<StatusService>,
    pub metrics: Metrics,
    scheduler: Arc<JobScheduler>,
}

impl Application {
    pub async fn build(
        config: Config,
        source: Arc<dyn ObservationSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        info!(
            "Building goldwatch (fetch every {:?}, retrain after {:?})...",
            config.schedule.fetch_interval, config.model.retrain_interval
        );

        if let Some(arity) = source.auxiliary_arity()
            && arity != config.storage.auxiliary_arity
        {
            bail!(
                "Source {} produces {} auxiliary signals but AUXILIARY_ARITY is {}",
                source.name(),
                arity,
                config.storage.auxiliary_arity
            );
        }

        let metrics = Metrics::new()?;
        let persistence = PersistenceBootstrap::init(&config).await?;

        let slot = Arc::new(PersistenceBootstrap::load_model(persistence.artifacts.as_ref()).await);
        if let Some(version) = slot.version() {
            metrics.model_version.set(version as f64);
        }
        metrics
            .observation_count
            .set(persistence.observation_repository.count().await? as f64);

        let cycle = MonitorCycle::new(
            CycleComponents {
                source,
                repository: persistence.observation_repository.clone(),
                artifacts: persistence.artifacts.clone(),
                slot: slot.clone(),
                trainer: ModelTrainer::new(
                    Arc::new(SmartcoreLinearFitter),
                    TrainerSettings::from(&config.model),
                ),
                detector: OpportunityDetector::new(DetectorSettings::from(&config.detection)),
                notifier,
                metrics: metrics.clone(),
            },
            CycleSettings::from(&config),
        );
        let scheduler = Arc::new(JobScheduler::new(
            cycle,
            config.schedule.fetch_interval,
            metrics.clone(),
        ));

        let status = Arc::new(StatusService::new(
            persistence.observation_repository.clone(),
            slot.clone(),
        ));

        Ok(Self {
            config,
            persistence,
            slot,
            status,
            metrics,
            scheduler,
        })
    }

    /// Run exactly one cycle in the foreground
    pub async fn run_once(&self) -> Result<Option<CycleReport>> {
        match self.scheduler.tick() {
            TickOutcome::Started(handle) => {
                let report = handle.await?;
                self.refresh_gauges().await;
                Ok(Some(report))
            }
            TickOutcome::Skipped => Ok(None),
        }
    }

    async fn refresh_gauges(&self) {
        if let Ok(count) = self.persistence.observation_repository.count().await {
            self.metrics.observation_count.set(count as f64);
        }
    }

    /// Spawn the scheduler, the metrics reporter and the Ctrl+C listener
    pub fn start(self) -> SystemHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        if self.config.observability.enabled {
            let reporter = MetricsReporter::new(
                self.metrics.clone(),
                self.config.observability.interval_seconds,
            );
            tokio::spawn(reporter.run(shutdown_rx.clone()));
        }

        // Keep the observation-count gauge fresh between reports
        {
            let repository = self.persistence.observation_repository.clone();
            let metrics = self.metrics.clone();
            let mut shutdown = shutdown_rx.clone();
            let interval = self.config.schedule.fetch_interval;
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {
                            if let Ok(count) = repository.count().await {
                                metrics.observation_count.set(count as f64);
                            }
                        }
                        _ = shutdown.changed() => return,
                    }
                }
            });
        }

        let signal_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C signal, shutting down.");
                    let _ = signal_tx.send(true);
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        let scheduler = self.scheduler.clone();
        let scheduler_task = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        SystemHandle {
            status: self.status.clone(),
            slot: self.slot.clone(),
            metrics: self.metrics.clone(),
            shutdown_tx,
            scheduler_task,
        }
    }
}
