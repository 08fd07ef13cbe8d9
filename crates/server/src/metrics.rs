//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the glbforge server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Job submissions by type
//! - Queue depth and worker activity (collected at scrape time)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

use glbforge_core::JobState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "glbforge_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("glbforge_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "glbforge_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Accepted job submissions.
pub static JOBS_SUBMITTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("glbforge_jobs_submitted_total", "Jobs accepted for processing"),
        &["type"],
    )
    .unwrap()
});

/// Rejected job submissions.
pub static JOBS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("glbforge_jobs_rejected_total", "Job submissions rejected"),
        &["reason"],
    )
    .unwrap()
});

/// Jobs by queue state (collected dynamically).
pub static QUEUE_JOBS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("glbforge_queue_jobs", "Current job count by queue state"),
        &["state"],
    )
    .unwrap()
});

// =============================================================================
// Worker Metrics (collected dynamically)
// =============================================================================

/// Worker running state (1 = running, 0 = stopped).
pub static WORKER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "glbforge_worker_running",
        "Whether the job worker is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Executions in flight per job type.
pub static WORKER_IN_FLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "glbforge_worker_jobs_in_flight",
            "Number of jobs currently executing, by type",
        ),
        &["type"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Jobs
    registry
        .register(Box::new(JOBS_SUBMITTED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(JOBS_REJECTED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(QUEUE_JOBS_BY_STATE.clone()))
        .unwrap();

    // Worker
    registry.register(Box::new(WORKER_RUNNING.clone())).unwrap();
    registry
        .register(Box::new(WORKER_IN_FLIGHT.clone()))
        .unwrap();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Queue gauges are only refreshed once the queue store has been opened, so a
/// scrape never forces the connection.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.worker().status();
    WORKER_RUNNING.set(if status.running { 1 } else { 0 });
    for (kind, in_flight) in &status.in_flight {
        WORKER_IN_FLIGHT
            .with_label_values(&[kind.as_str()])
            .set(*in_flight as i64);
    }

    let queue = state.queue();
    if !queue.is_connected() {
        return;
    }
    match queue.counts().await {
        Ok(counts) => {
            for job_state in JobState::ALL {
                QUEUE_JOBS_BY_STATE
                    .with_label_values(&[job_state.as_str()])
                    .set(counts.get(job_state) as i64);
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to collect queue counts"),
    }
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
///
/// Conversion and job ids are caller-chosen strings, so the segment after
/// `/conversions/` or `/jobs/` is always replaced; artifact paths under
/// `/models/` collapse to a single label.
pub fn normalize_path(path: &str) -> String {
    for prefix in ["/api/v1/conversions/", "/api/v1/jobs/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            if !rest.is_empty() {
                return format!("{prefix}{{id}}");
            }
        }
    }
    if path.starts_with("/models/") {
        return "/models/{file}".to_string();
    }

    let result = UUID_RE.replace_all(path, "{id}");
    let result = NUMERIC_RE.replace_all(&result, "/{id}$1");
    result.to_string()
}
