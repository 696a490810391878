//! Metrics module for audit-service.
//! Prometheus metrics for audit runs and per-domain exposure counts.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!("audit_db_query_duration_seconds", "Database query duration"),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Audit runs by domain and outcome
pub static AUDIT_RUNS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Users scanned across all runs
pub static USERS_SCANNED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Public files discovered across all runs
pub static PUBLIC_FILES_FOUND_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Per-user scan failures absorbed into completed runs
pub static SCAN_FAILURES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Connection setup/teardown operations
pub static CONNECTION_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    AUDIT_RUNS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "audit_runs_total",
                "Total audit runs by domain and outcome"
            ),
            &["domain", "outcome"]
        )
        .expect("Failed to register AUDIT_RUNS_TOTAL")
    });

    USERS_SCANNED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("audit_users_scanned_total", "Total users scanned by domain"),
            &["domain"]
        )
        .expect("Failed to register USERS_SCANNED_TOTAL")
    });

    PUBLIC_FILES_FOUND_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "audit_public_files_found_total",
                "Total publicly shared files discovered by domain"
            ),
            &["domain"]
        )
        .expect("Failed to register PUBLIC_FILES_FOUND_TOTAL")
    });

    SCAN_FAILURES_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "audit_scan_failures_total",
                "Per-user scan failures absorbed into completed runs"
            ),
            &["domain"]
        )
        .expect("Failed to register SCAN_FAILURES_TOTAL")
    });

    CONNECTION_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "audit_connection_operations_total",
                "Connection operations by type"
            ),
            &["operation"]
        )
        .expect("Failed to register CONNECTION_OPERATIONS_TOTAL")
    });
}

/// Render all registered metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Increment a OnceLock-guarded counter if metrics are initialized.
pub fn inc_counter(metric: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(counter) = metric.get() {
        counter.with_label_values(labels).inc();
    }
}

/// Add to a OnceLock-guarded counter if metrics are initialized.
pub fn add_counter(metric: &OnceLock<IntCounterVec>, labels: &[&str], value: u64) {
    if let Some(counter) = metric.get() {
        counter.with_label_values(labels).inc_by(value);
    }
}
