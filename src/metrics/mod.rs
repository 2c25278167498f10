//! Prometheus metrics for taskhub
//!
//! This module provides metrics tracking for:
//! - Restart requests: outcomes and duration
//! - Compensation: rollback runs and failed rollback steps
//! - HTTP API: requests per endpoint and status
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec,
    Counter, CounterVec, Encoder, Histogram, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all restart metrics
struct RestartMetrics {
    restarts: CounterVec,
    restart_duration: Histogram,
    compensations: Counter,
    compensation_failures: CounterVec,
    api_requests: CounterVec,
    api_duration: HistogramVec,
}

/// Global storage for restart metrics
static RESTART_METRICS: OnceLock<RestartMetrics> = OnceLock::new();

/// Outcome of the one registration attempt
static METRICS_INIT: OnceLock<Result<(), String>> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup; later calls
/// return the result of the first one. If metric registration fails,
/// subsequent metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = taskhub::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Concurrent callers block until the first registration finishes
    METRICS_INIT
        .get_or_init(|| register_metrics().map_err(|e| e.to_string()))
        .clone()
        .map_err(Into::into)
}

fn register_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let metrics = RestartMetrics {
        restarts: register_counter_vec!(
            "taskhub_restarts_total",
            "Total task restart requests by outcome",
            &["outcome"]
        )?,
        restart_duration: register_histogram!(
            "taskhub_restart_duration_seconds",
            "Time spent handling a restart request in seconds",
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
        )?,
        compensations: register_counter!(
            "taskhub_compensations_total",
            "Total rollbacks triggered by a failed status commit"
        )?,
        compensation_failures: register_counter_vec!(
            "taskhub_compensation_failures_total",
            "Total rollback steps that failed, by step",
            &["step"]
        )?,
        api_requests: register_counter_vec!(
            "taskhub_api_requests_total",
            "Total API requests by endpoint and status",
            &["endpoint", "status"]
        )?,
        api_duration: register_histogram_vec!(
            "taskhub_api_request_duration_seconds",
            "API request duration in seconds",
            &["endpoint"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
        )?,
    };

    RESTART_METRICS
        .set(metrics)
        .map_err(|_| "Restart metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    RESTART_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a finished restart request
pub fn record_restart(outcome: &str) {
    if let Some(m) = RESTART_METRICS.get() {
        m.restarts.with_label_values(&[outcome]).inc();
    }
}

/// Record a compensation run
pub fn record_compensation() {
    if let Some(m) = RESTART_METRICS.get() {
        m.compensations.inc();
    }
}

/// Record a failed compensation step (`cron_stop` or `crawl_cancel`)
pub fn record_compensation_failure(step: &str) {
    if let Some(m) = RESTART_METRICS.get() {
        m.compensation_failures.with_label_values(&[step]).inc();
    }
}

/// Record API request
pub fn record_api_request(endpoint: &str, status: u16, duration_secs: f64) {
    let Some(m) = RESTART_METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.api_requests
        .with_label_values(&[endpoint, status_str.as_str()])
        .inc();
    m.api_duration
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a restart timer (returns a timer handle)
pub fn start_restart_timer() -> MetricsTimer {
    match RESTART_METRICS.get() {
        Some(m) => MetricsTimer::new(m.restart_duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================
