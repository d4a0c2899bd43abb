//! Push-based observability for goldwatch
//!
//! Outbound data only, no HTTP server:
//!
//! 1. **Prometheus registry**: counters and gauges updated by the monitor cycle
//! 2. **Structured JSON Logs**: periodic `METRICS_JSON:` lines on stdout

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
