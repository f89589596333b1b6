//! Prometheus metrics for observability.
//!
//! This module provides the server side metrics:
//! - HTTP request metrics (latency, counts, in flight)
//! - Task counts by status and pool occupancy (collected on scrape)
//!
//! Core metrics (tasks, separations, relocations) are registered here too so
//! `/metrics` exposes a single registry.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use stemyard_core::TaskStatus;

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
            "stemyard_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 30.0, 120.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stemyard_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "stemyard_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// State Metrics (collected on scrape)
// =============================================================================

/// Retained tasks by status.
pub static TASKS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("stemyard_tasks_by_status", "Retained tasks by status"),
        &["status"],
    )
    .unwrap()
});

/// Jobs waiting for a pool slot.
pub static POOL_QUEUED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "stemyard_pool_queued_jobs",
        "Number of jobs waiting for a processor slot",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(TASKS_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(POOL_QUEUED.clone())).unwrap();

    for metric in stemyard_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
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

/// Refresh gauges from the current application state before a scrape.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let tasks = state.tasks().list();
    for status in [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ] {
        let count = tasks.iter().filter(|t| t.status == status).count();
        TASKS_BY_STATUS
            .with_label_values(&[status.as_str()])
            .set(count as i64);
    }

    POOL_QUEUED.set(state.processor().status().queued_jobs as i64);
}

static TASK_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/api/task/[^/]+$").unwrap());
static SEPARATED_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/separated/[^/]+$").unwrap());
static STATIC_MOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(music|separated)/.+$").unwrap());

/// Normalize a path for metric labels (replace ids and file paths with placeholders).
pub fn normalize_path(path: &str) -> String {
    if TASK_PATH.is_match(path) {
        return "/api/task/{id}".to_string();
    }
    if SEPARATED_PATH.is_match(path) {
        return "/api/separated/{id}".to_string();
    }
    if let Some(caps) = STATIC_MOUNT.captures(path) {
        return format!("/{}/{{file}}", &caps[1]);
    }
    if path.starts_with("/api/") || path == "/metrics" || path == "/" {
        return path.to_string();
    }
    "/{static}".to_string()
}
