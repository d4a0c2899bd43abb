//! Push-based metrics reporter for goldwatch
//!
//! Periodically outputs metrics as structured JSON to stdout.

use crate::domain::market::DeviationKind;
use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub monitor: MonitorSnapshot,
    pub cycles: CycleSnapshot,
}

#[derive(Serialize)]
pub struct MonitorSnapshot {
    pub observation_count: u64,
    pub last_price: Option<f64>,
    pub model_version: Option<u64>,
}

#[derive(Serialize)]
pub struct CycleSnapshot {
    pub completed: u64,
    pub fetch_failed: u64,
    pub store_failed: u64,
    pub ticks_skipped: u64,
    pub alerts_below: u64,
    pub alerts_above: u64,
    pub alerts_divergence: u64,
}

/// Push-based metrics reporter
///
/// Outputs metrics as structured JSON logs on a configurable interval.
pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    /// Emit a snapshot every interval until shutdown is signalled
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("MetricsReporter: shutting down");
                    return;
                }
            }

            let snapshot = self.collect_snapshot();
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    // Prefix so log shippers can filter these lines
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Observations: {} | Model: {:?} | Cycles ok/failed: {}/{} | Uptime: {}s",
                        snapshot.monitor.observation_count,
                        snapshot.monitor.model_version,
                        snapshot.cycles.completed,
                        snapshot.cycles.fetch_failed + snapshot.cycles.store_failed,
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("Failed to serialize metrics: {}", e),
            }
        }
    }

    fn collect_snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        self.metrics.uptime_seconds.set(uptime as f64);

        let version = self.metrics.model_version.get();
        let last_price = self.metrics.last_price.get();

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            monitor: MonitorSnapshot {
                observation_count: self.metrics.observation_count.get() as u64,
                last_price: (last_price > 0.0).then_some(last_price),
                model_version: (version > 0.0).then_some(version as u64),
            },
            cycles: CycleSnapshot {
                completed: self.metrics.cycle_count("completed"),
                fetch_failed: self.metrics.cycle_count("fetch_failed"),
                store_failed: self.metrics.cycle_count("store_failed"),
                ticks_skipped: self.metrics.ticks_skipped_total.get() as u64,
                alerts_below: self
                    .metrics
                    .alert_count(DeviationKind::BelowThreshold.as_str()),
                alerts_above: self
                    .metrics
                    .alert_count(DeviationKind::AboveThreshold.as_str()),
                alerts_divergence: self
                    .metrics
                    .alert_count(DeviationKind::ModelDivergence.as_str()),
            },
        }
    }
}
