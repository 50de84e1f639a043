//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the moviebox server:
//! - HTTP request metrics (latency, counts)
//! - Catalog and details cache sizes (collected dynamically)

use std::sync::Arc;

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::warn;

use crate::state::AppState;

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
            "moviebox_http_request_duration_seconds",
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
        Opts::new("moviebox_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "moviebox_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics (collected dynamically)
// =============================================================================

/// Movies in the catalog.
pub static CATALOG_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("moviebox_catalog_entries", "Number of movies in the catalog").unwrap()
});

/// Movies whose file is currently reachable.
pub static CATALOG_AVAILABLE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "moviebox_catalog_available",
        "Number of catalogued movies whose file is reachable",
    )
    .unwrap()
});

/// Cached detail records.
pub static DETAILS_CACHED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("moviebox_details_cached", "Number of cached movie detail records").unwrap()
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

    // Catalog
    registry
        .register(Box::new(CATALOG_ENTRIES.clone()))
        .unwrap();
    registry
        .register(Box::new(CATALOG_AVAILABLE.clone()))
        .unwrap();
    registry
        .register(Box::new(DETAILS_CACHED.clone()))
        .unwrap();

    // Core metrics (refreshes, reconciliation, external services)
    for metric in moviebox_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Update gauges from current application state before encoding.
/// Catalog statistics are gathered on the blocking pool.
pub async fn collect_dynamic_metrics(state: &AppState) {
    let catalog = Arc::clone(state.catalog());
    match tokio::task::spawn_blocking(move || catalog.stats()).await {
        Ok(stats) => {
            CATALOG_ENTRIES.set(stats.total_movies as i64);
            CATALOG_AVAILABLE.set(stats.available_movies as i64);
        }
        Err(e) => warn!("Failed to collect catalog metrics: {}", e),
    }
    DETAILS_CACHED.set(state.details().cached() as i64);
}

/// Normalize a path for metric labels (replace numeric ids with placeholders).
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else if is_info_hash(segment) {
                "{hash}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Hex (40) or base32 (32) encoded torrent info hash.
fn is_info_hash(segment: &str) -> bool {
    match segment.len() {
        40 => segment.bytes().all(|b| b.is_ascii_hexdigit()),
        32 => segment.bytes().all(|b| b.is_ascii_alphanumeric()),
        _ => false,
    }
}
