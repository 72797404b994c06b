//! Prometheus counters/gauges for the shared state, plus HDR-histogram
//! percentile tracking for request and scenario latency.
//!
//! Grounded in the teacher's `metrics.rs` (namespace/registration pattern,
//! trimmed of the `hyper` metrics HTTP server — serving `/metrics` is an
//! outer-surface concern, not part of the simulation engine) and
//! `percentiles.rs` (the single-tracker half; the multi-label LRU-evicting
//! variant is dropped as unneeded here — one tracker per latency kind is
//! enough for an engine with no per-endpoint label cardinality of its own).

use hdrhistogram::Histogram;
use prometheus::{Encoder, Gauge, HistogramVec, IntCounter, Opts, TextEncoder};
use std::env;
use std::sync::Mutex;
use tracing::warn;

lazy_static::lazy_static! {
    pub static ref METRIC_NAMESPACE: String =
        env::var("METRIC_NAMESPACE").unwrap_or_else(|_| "vuser_sim".to_string());

    pub static ref SENT_REQUESTS_TOTAL: IntCounter =
        IntCounter::with_opts(
            Opts::new("sent_requests_total", "Total number of steps dispatched")
                .namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();

    pub static ref CONCURRENT_SCENARIOS: Gauge =
        Gauge::with_opts(
            Opts::new("concurrent_scenarios", "Number of scenario walks currently in flight")
                .namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();

    pub static ref REQUEST_DURATION_SECONDS: HistogramVec =
        HistogramVec::new(
            prometheus::HistogramOpts::new(
                "request_duration_seconds",
                "Step execution duration in seconds"
            ).namespace(METRIC_NAMESPACE.as_str()),
            &["scenario", "step", "result"]
        ).unwrap();

    pub static ref SCENARIO_DURATION_SECONDS: HistogramVec =
        HistogramVec::new(
            prometheus::HistogramOpts::new(
                "scenario_duration_seconds",
                "Scenario walk duration in seconds"
            ).namespace(METRIC_NAMESPACE.as_str()),
            &["scenario", "result"]
        ).unwrap();
}

/// Registers every metric above with the default Prometheus registry.
/// Call once per process; a second call is an error the caller should log
/// and ignore, since the registry is process-global.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    prometheus::default_registry().register(Box::new(SENT_REQUESTS_TOTAL.clone()))?;
    prometheus::default_registry().register(Box::new(CONCURRENT_SCENARIOS.clone()))?;
    prometheus::default_registry().register(Box::new(REQUEST_DURATION_SECONDS.clone()))?;
    prometheus::default_registry().register(Box::new(SCENARIO_DURATION_SECONDS.clone()))?;
    Ok(())
}

/// Gathers and encodes every registered metric as Prometheus text exposition
/// format, for an embedding application to serve however it likes.
pub fn gather_metrics_string() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::default_registry().gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Summary statistics derived from a [`PercentileTracker`] snapshot.
#[derive(Debug, Clone)]
pub struct PercentileStats {
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
}

/// Thread-safe percentile tracker over millisecond latencies, backed by
/// HdrHistogram. One instance covers all request durations; callers needing
/// a per-scenario breakdown hold one tracker per scenario name.
pub struct PercentileTracker {
    histogram: Mutex<Histogram<u64>>,
}

impl PercentileTracker {
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, 60_000, 3).expect("valid histogram bounds");
        Self {
            histogram: Mutex::new(histogram),
        }
    }

    pub fn record_ms(&self, latency_ms: u64) {
        let clamped = latency_ms.clamp(1, 60_000);
        let mut hist = self.histogram.lock().unwrap();
        if let Err(e) = hist.record(clamped) {
            warn!(latency_ms = latency_ms, error = %e, "failed to record latency");
        }
    }

    pub fn stats(&self) -> Option<PercentileStats> {
        let hist = self.histogram.lock().unwrap();
        if hist.is_empty() {
            return None;
        }
        Some(PercentileStats {
            count: hist.len(),
            min: hist.min(),
            max: hist.max(),
            mean: hist.mean(),
            p50: hist.value_at_quantile(0.50),
            p90: hist.value_at_quantile(0.90),
            p95: hist.value_at_quantile(0.95),
            p99: hist.value_at_quantile(0.99),
        })
    }
}

impl Default for PercentileTracker {
    fn default() -> Self {
        Self::new()
    }
}
