use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ScheduleStatus;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Schedule {0} is not active")]
    NotActive(Uuid),

    #[error("Invoice already generated for schedule {schedule_id}, cycle due {due_date}")]
    DuplicateGeneration {
        schedule_id: Uuid,
        due_date: NaiveDate,
    },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ScheduleStatus,
        to: ScheduleStatus,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[source] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl BillingError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::Validation(_) => "validation",
            BillingError::NotFound(_) => "not_found",
            BillingError::NotActive(_) => "not_active",
            BillingError::DuplicateGeneration { .. } => "duplicate_generation",
            BillingError::InvalidTransition { .. } => "invalid_transition",
            BillingError::Persistence(_) => "persistence",
            BillingError::Config(_) => "config",
        }
    }

    /// Persistence failures leave the schedule unmodified and may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Persistence(_))
    }
}
