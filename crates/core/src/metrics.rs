//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Task lifecycle (created, finished by outcome)
//! - Separation and transcoding duration
//! - Relocations and searches

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Tasks
// =============================================================================

/// Tasks created by kind.
pub static TASKS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stemyard_tasks_created_total", "Total tasks created"),
        &["kind"], // "download", "separation"
    )
    .unwrap()
});

/// Tasks reaching a terminal state by kind and outcome.
pub static TASKS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stemyard_tasks_finished_total", "Total tasks finished"),
        &["kind", "outcome"], // "completed", "failed"
    )
    .unwrap()
});

/// Jobs currently holding a processor permit.
pub static ACTIVE_JOBS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("stemyard_active_jobs", "Jobs currently running").unwrap()
});

// =============================================================================
// Adapters
// =============================================================================

/// Separation duration in seconds.
pub static SEPARATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "stemyard_separation_duration_seconds",
            "Duration of stem separation",
        )
        .buckets(vec![10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 3600.0]),
        &["model", "result"],
    )
    .unwrap()
});

/// Download duration in seconds.
pub static DOWNLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "stemyard_download_duration_seconds",
            "Duration of audio downloads",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["result"],
    )
    .unwrap()
});

/// Transcodes by result.
pub static TRANSCODES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stemyard_transcodes_total", "Total transcode operations"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Relocations by result.
pub static RELOCATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stemyard_relocations_total", "Total stem relocations"),
        &["result"], // "success", "missing_output", "failed"
    )
    .unwrap()
});

/// Search requests by result.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stemyard_searches_total", "Total search requests"),
        &["result"],
    )
    .unwrap()
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Tasks
        Box::new(TASKS_CREATED.clone()),
        Box::new(TASKS_FINISHED.clone()),
        Box::new(ACTIVE_JOBS.clone()),
        // Adapters
        Box::new(SEPARATION_DURATION.clone()),
        Box::new(DOWNLOAD_DURATION.clone()),
        Box::new(TRANSCODES_TOTAL.clone()),
        Box::new(RELOCATIONS_TOTAL.clone()),
        Box::new(SEARCHES_TOTAL.clone()),
    ]
}
