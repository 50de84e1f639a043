//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Catalog refreshes (results, duration)
//! - Reconciliation (movies added and removed)
//! - External services (TMDB, qBittorrent)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Catalog Metrics
// =============================================================================

/// Catalog refreshes total by result.
pub static REFRESHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("moviebox_catalog_refreshes_total", "Total catalog refreshes"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

/// Catalog refresh duration in seconds.
pub static REFRESH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "moviebox_catalog_refresh_duration_seconds",
            "Duration of catalog reconciliation",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap()
});

/// Movies added by reconciliation.
pub static MOVIES_ADDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "moviebox_catalog_movies_added_total",
        "Movies discovered and added to the catalog",
    )
    .unwrap()
});

/// Movies removed by reconciliation.
pub static MOVIES_REMOVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "moviebox_catalog_movies_removed_total",
        "Movies removed because their file is gone from a mounted drive",
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "moviebox_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "moviebox_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(REFRESHES_TOTAL.clone()),
        Box::new(REFRESH_DURATION.clone()),
        Box::new(MOVIES_ADDED.clone()),
        Box::new(MOVIES_REMOVED.clone()),
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        REFRESHES_TOTAL.with_label_values(&["success"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "moviebox_catalog_refreshes_total"));
    }
}
