//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (searches, downloads)
//! - Provider calls (per provider and operation)
//! - Cache maintenance

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Orchestrator - Search Metrics
// =============================================================================

/// Searches total by outcome.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("subfinder_searches_total", "Total subtitle searches"),
        &["outcome"], // "cache_hit", "cache_miss", "no_providers", "no_languages"
    )
    .unwrap()
});

/// Ranked results returned per search.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "subfinder_search_results",
            "Number of ranked results returned per search",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Orchestrator - Download Metrics
// =============================================================================

/// Downloads total by terminal state.
pub static DOWNLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("subfinder_downloads_total", "Total subtitle downloads"),
        &["outcome"], // "cache_hit", "downloaded", "rate_limited", "error"
    )
    .unwrap()
});

// =============================================================================
// Providers
// =============================================================================

/// Provider requests by provider, operation and status.
pub static PROVIDER_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "subfinder_provider_requests_total",
            "Total requests dispatched to subtitle providers",
        ),
        &["provider", "operation", "status"], // operation: "search", "download"
    )
    .unwrap()
});

/// Provider request duration in seconds.
pub static PROVIDER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "subfinder_provider_request_duration_seconds",
            "Duration of subtitle provider requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["provider", "operation"],
    )
    .unwrap()
});

/// Errors delivered to the error reporter.
pub static REPORTED_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "subfinder_reported_errors_total",
        "Total errors delivered to the error reporter",
    )
    .unwrap()
});

// =============================================================================
// Cache Maintenance
// =============================================================================

/// Expired result sets removed by maintenance.
pub static CACHE_ENTRIES_EXPIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "subfinder_cache_entries_expired_total",
        "Expired search result sets removed by maintenance",
    )
    .unwrap()
});

/// Cached files evicted by maintenance.
pub static CACHE_FILES_EVICTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "subfinder_cache_files_evicted_total",
        "Cached subtitle files deactivated by maintenance",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Searches
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        // Downloads
        Box::new(DOWNLOADS_TOTAL.clone()),
        // Providers
        Box::new(PROVIDER_REQUESTS.clone()),
        Box::new(PROVIDER_DURATION.clone()),
        Box::new(REPORTED_ERRORS.clone()),
        // Cache
        Box::new(CACHE_ENTRIES_EXPIRED.clone()),
        Box::new(CACHE_FILES_EVICTED.clone()),
    ]
}
