//! Services module for billing-engine.

pub mod metrics;

pub use metrics::{
    get_metrics, init_metrics, record_billing_run, record_error, record_generation_duration,
    record_invoice_generated, record_reminders_sent, record_schedule_operation,
};
