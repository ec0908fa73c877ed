//! Metrics module for billing-engine.
//! Provides Prometheus metrics for generation, billing runs, and lifecycle
//! operations.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram, register_int_counter_vec, Encoder, Histogram,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Invoice generation duration histogram
pub static GENERATION_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(histogram_opts!(
        "billing_generation_duration_seconds",
        "Invoice generation duration",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ))
    .expect("Failed to register GENERATION_DURATION")
});

/// Invoices generated counter
pub static INVOICES_GENERATED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Schedule operations counter
pub static SCHEDULE_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Billing runs counter
pub static BILLING_RUNS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Reminders handed to the notification sink
pub static REMINDERS_SENT_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    INVOICES_GENERATED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_invoices_generated_total",
                "Total invoices generated by schedule frequency"
            ),
            &["frequency"]
        )
        .expect("Failed to register INVOICES_GENERATED_TOTAL")
    });

    SCHEDULE_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_schedule_operations_total",
                "Total schedule operations by type"
            ),
            &["operation"]
        )
        .expect("Failed to register SCHEDULE_OPERATIONS_TOTAL")
    });

    BILLING_RUNS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_runs_total",
                "Total billing runs by run type and status"
            ),
            &["run_type", "status"]
        )
        .expect("Failed to register BILLING_RUNS_TOTAL")
    });

    REMINDERS_SENT_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_reminders_sent_total",
                "Total reminders handed to the notification sink"
            ),
            &["result"]
        )
        .expect("Failed to register REMINDERS_SENT_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("billing_errors_total", "Total errors by type for alerting"),
            &["error_type", "operation"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*GENERATION_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to string")
}

/// Record a generated invoice.
pub fn record_invoice_generated(frequency: &str) {
    if let Some(counter) = INVOICES_GENERATED_TOTAL.get() {
        counter.with_label_values(&[frequency]).inc();
    }
}

/// Record a schedule operation.
pub fn record_schedule_operation(operation: &str) {
    if let Some(counter) = SCHEDULE_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[operation]).inc();
    }
}

/// Record a billing run.
pub fn record_billing_run(run_type: &str, status: &str) {
    if let Some(counter) = BILLING_RUNS_TOTAL.get() {
        counter.with_label_values(&[run_type, status]).inc();
    }
}

/// Record reminders handed to the sink.
pub fn record_reminders_sent(count: usize) {
    if let Some(counter) = REMINDERS_SENT_TOTAL.get() {
        counter
            .with_label_values(&["delivered"])
            .inc_by(count as u64);
    }
}

/// Record invoice generation duration.
pub fn record_generation_duration(duration_secs: f64) {
    GENERATION_DURATION.observe(duration_secs);
}

/// Record an error for alerting.
pub fn record_error(error_type: &str, operation: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type, operation]).inc();
    }
}
