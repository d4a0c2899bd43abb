//! Prometheus metrics definitions for goldwatch
//!
//! All metrics use the `goldwatch_` prefix.

use prometheus::{
    Counter, CounterVec, Gauge, HistogramOpts, HistogramTimer, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for the monitor
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Cycles by terminal outcome (completed, fetch_failed, store_failed)
    pub cycles_total: CounterVec,
    /// Ticks dropped because a cycle was still running
    pub ticks_skipped_total: Counter,
    /// Training attempts by outcome (published, not_due, failed, persist_failed)
    pub training_total: CounterVec,
    /// Alerts emitted by deviation kind
    pub alerts_total: CounterVec,
    /// Notifier deliveries that failed
    pub notify_failures_total: Counter,
    /// Version of the model currently in use (0 = none)
    pub model_version: Gauge,
    /// Stored observations
    pub observation_count: Gauge,
    /// Most recently observed price
    pub last_price: Gauge,
    /// Uptime in seconds
    pub uptime_seconds: Gauge,
    /// Acquisition latency in seconds
    pub fetch_latency_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles_total = CounterVec::new(
            Opts::new("goldwatch_cycles_total", "Monitor cycles by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(cycles_total.clone()))?;

        let ticks_skipped_total = Counter::with_opts(Opts::new(
            "goldwatch_ticks_skipped_total",
            "Ticks skipped because the previous cycle was still running",
        ))?;
        registry.register(Box::new(ticks_skipped_total.clone()))?;

        let training_total = CounterVec::new(
            Opts::new("goldwatch_training_total", "Training attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(training_total.clone()))?;

        let alerts_total = CounterVec::new(
            Opts::new("goldwatch_alerts_total", "Alerts emitted by deviation kind"),
            &["kind"],
        )?;
        registry.register(Box::new(alerts_total.clone()))?;

        let notify_failures_total = Counter::with_opts(Opts::new(
            "goldwatch_notify_failures_total",
            "Alert deliveries that failed",
        ))?;
        registry.register(Box::new(notify_failures_total.clone()))?;

        let model_version = Gauge::with_opts(Opts::new(
            "goldwatch_model_version",
            "Version of the model in use (0 = none)",
        ))?;
        registry.register(Box::new(model_version.clone()))?;

        let observation_count = Gauge::with_opts(Opts::new(
            "goldwatch_observation_count",
            "Number of stored observations",
        ))?;
        registry.register(Box::new(observation_count.clone()))?;

        let last_price = Gauge::with_opts(Opts::new(
            "goldwatch_last_price",
            "Most recently observed price",
        ))?;
        registry.register(Box::new(last_price.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "goldwatch_uptime_seconds",
            "Process uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let fetch_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "goldwatch_fetch_latency_seconds",
                "Acquisition latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["source"],
        )?;
        registry.register(Box::new(fetch_latency_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            cycles_total,
            ticks_skipped_total,
            training_total,
            alerts_total,
            notify_failures_total,
            model_version,
            observation_count,
            last_price,
            uptime_seconds,
            fetch_latency_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_cycle(&self, outcome: &str) {
        self.cycles_total.with_label_values(&[outcome]).inc();
    }

    pub fn cycle_count(&self, outcome: &str) -> u64 {
        self.cycles_total.with_label_values(&[outcome]).get() as u64
    }

    pub fn inc_training(&self, outcome: &str) {
        self.training_total.with_label_values(&[outcome]).inc();
    }

    pub fn inc_alert(&self, kind: &str) {
        self.alerts_total.with_label_values(&[kind]).inc();
    }

    pub fn alert_count(&self, kind: &str) -> u64 {
        self.alerts_total.with_label_values(&[kind]).get() as u64
    }

    /// Observes the fetch latency for `source` when the returned timer drops
    pub fn fetch_timer(&self, source: &str) -> HistogramTimer {
        self.fetch_latency_seconds
            .with_label_values(&[source])
            .start_timer()
    }
}
