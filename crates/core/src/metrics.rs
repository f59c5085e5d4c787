//! Prometheus metrics for the conversion engine.
//!
//! This module provides metrics for:
//! - Dispatcher (conversions, rejections, durations)
//! - Batch processor (batches, batch sizes, per-file failures)
//! - Packager (deliveries by kind)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Dispatcher Metrics
// =============================================================================

/// Conversions total by source, target and result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("docshift_conversions_total", "Total conversions attempted"),
        &["source", "target", "result"], // result: "completed", "failed"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "docshift_conversion_duration_seconds",
            "Duration of a single conversion",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["source", "target"],
    )
    .unwrap()
});

/// Files rejected before any strategy ran.
pub static FILES_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docshift_files_rejected_total",
            "Files rejected before conversion",
        ),
        &["reason"], // "classification", "capability"
    )
    .unwrap()
});

// =============================================================================
// Batch Metrics
// =============================================================================

/// Batches run total.
pub static BATCHES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("docshift_batches_total", "Total batches processed").unwrap()
});

/// Files per batch.
pub static BATCH_SIZE: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("docshift_batch_size", "Number of files per batch")
            .buckets(vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
    )
    .unwrap()
});

/// Failed files across all batches.
pub static BATCH_FILE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "docshift_batch_file_failures_total",
        "Total files that failed inside a batch",
    )
    .unwrap()
});

// =============================================================================
// Packager Metrics
// =============================================================================

/// Deliveries by kind.
pub static DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("docshift_deliveries_total", "Total deliveries produced"),
        &["kind"], // "file", "archive"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all engine metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Dispatcher
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(FILES_REJECTED.clone()),
        // Batch
        Box::new(BATCHES_TOTAL.clone()),
        Box::new(BATCH_SIZE.clone()),
        Box::new(BATCH_FILE_FAILURES.clone()),
        // Packager
        Box::new(DELIVERIES_TOTAL.clone()),
    ]
}

/// Registers every engine metric in `registry`.
pub fn register_metrics(registry: &prometheus::Registry) -> Result<(), prometheus::Error> {
    for metric in all_metrics() {
        registry.register(metric)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        let registry = prometheus::Registry::new();
        register_metrics(&registry).unwrap();

        CONVERSIONS_TOTAL
            .with_label_values(&["txt", "pdf", "completed"])
            .inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "docshift_conversions_total"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = prometheus::Registry::new();
        register_metrics(&registry).unwrap();
        assert!(register_metrics(&registry).is_err());
    }
}
